// src/services/housekeeping.rs
//
// Rotina diária em processo: zera o contador de requisições dos clientes à meia-noite local.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Days, Local, TimeZone};
use tokio::task::JoinHandle;

use crate::common::error::AppError;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Zera `daily_request_count`; devolve quantos clientes tinham contador > 0.
    async fn reset_daily_request_counts(&self) -> Result<u64, AppError>;
}

/// Quanto falta até a próxima meia-noite local.
pub fn until_next_midnight<Tz: TimeZone>(now: DateTime<Tz>) -> Duration {
    let tz = now.timezone();
    let next = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest());

    match next {
        Some(next) => (next - now).to_std().unwrap_or(Duration::from_secs(1)),
        // Meia-noite inexistente (troca de horário): tenta de novo em uma hora
        None => Duration::from_secs(60 * 60),
    }
}

pub async fn run_once(store: &dyn CounterStore) {
    match store.reset_daily_request_counts().await {
        Ok(count) => tracing::info!("🌙 Contadores diários zerados ({} clientes)", count),
        Err(e) => tracing::error!("🔥 Falha ao zerar contadores diários: {}", e),
    }
}

/// Dispara o laço em segundo plano. Falhas são logadas e o laço segue.
pub fn spawn(store: Arc<dyn CounterStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = until_next_midnight(Local::now());
            tracing::debug!("Próxima rotina diária em {:?}", wait);
            tokio::time::sleep(wait).await;
            run_once(store.as_ref()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn waits_until_the_next_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 22, 30, 0).unwrap();
        assert_eq!(until_next_midnight(now), Duration::from_secs(90 * 60));

        let at_midnight = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert_eq!(until_next_midnight(at_midnight), Duration::from_secs(24 * 60 * 60));
    }

    struct Counting(AtomicU64);

    #[async_trait]
    impl CounterStore for Counting {
        async fn reset_daily_request_counts(&self) -> Result<u64, AppError> {
            Ok(self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    struct Broken;

    #[async_trait]
    impl CounterStore for Broken {
        async fn reset_daily_request_counts(&self) -> Result<u64, AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("sem conexão")))
        }
    }

    #[tokio::test]
    async fn run_once_absorbs_failures() {
        let store = Counting(AtomicU64::new(0));
        run_once(&store).await;
        run_once(&store).await;
        assert_eq!(store.0.load(Ordering::SeqCst), 2);

        run_once(&Broken).await;
    }
}
