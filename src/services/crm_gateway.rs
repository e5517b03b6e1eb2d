// src/services/crm_gateway.rs
//
// Contrato com o CRM externo. O núcleo depende apenas do trait `CrmGateway`;
// `HttpCrmGateway` é a implementação sobre HTTP usada em produção.
//
// Convenção de caminhos (relativos a CRM_BASE_URL):
//
// | Método | Caminho                          | Operação            |
// |--------|----------------------------------|---------------------|
// | GET    | `/{tipo}/{crmId}`                | fetch_entity        |
// | GET    | `/{tipo}/search?keyword=`        | search_entities     |
// | GET    | `/{tipo}?parentId=&page=&limit=` | list_child_records  |
// | POST   | `/{tipo}`                        | create_record       |
// | POST   | `/documents/upload`              | upload_document     |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, multipart, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;

pub type CrmRecord = Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrmEntityType {
    Account,
    Contact,
    Claim,
    Document,
    Policy,
}

impl CrmEntityType {
    pub fn path(&self) -> &'static str {
        match self {
            CrmEntityType::Account => "accounts",
            CrmEntityType::Contact => "contacts",
            CrmEntityType::Claim => "claims",
            CrmEntityType::Document => "documents",
            CrmEntityType::Policy => "policies",
        }
    }
}

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("falha de transporte em {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("CRM respondeu {status} em {endpoint}: {body}")]
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("registro {crm_id} não encontrado em {entity}")]
    NotFound { entity: &'static str, crm_id: String },

    #[error("resposta inválida de {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("id de registro do CRM inválido: '{0}'")]
    InvalidId(String),

    #[error("configuração do CRM inválida: {0}")]
    Config(String),
}

/// Página de registros filhos: `{list, totalCount}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmPage {
    #[serde(default)]
    pub list: Vec<CrmRecord>,
    #[serde(default)]
    pub total_count: i64,
}

/// Arquivo a ser anexado a um registro do CRM.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub description: Option<String>,
}

#[async_trait]
pub trait CrmGateway: Send + Sync {
    /// `Ok(None)` quando o CRM responde 404.
    async fn fetch_entity(&self, entity: CrmEntityType, crm_id: &str)
        -> Result<Option<CrmRecord>, CrmError>;

    async fn search_entities(&self, entity: CrmEntityType, keyword: &str)
        -> Result<Vec<CrmRecord>, CrmError>;

    async fn list_child_records(
        &self,
        entity: CrmEntityType,
        parent_crm_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<CrmPage, CrmError>;

    async fn create_record(&self, entity: CrmEntityType, fields: &Value)
        -> Result<CrmRecord, CrmError>;

    async fn upload_document(
        &self,
        parent_crm_id: &str,
        parent_type: CrmEntityType,
        upload: DocumentUpload,
    ) -> Result<Value, CrmError>;
}

/// Converte registros crus do CRM nos tipos do domínio.
pub fn decode_records<T: DeserializeOwned>(
    endpoint: &str,
    records: Vec<CrmRecord>,
) -> Result<Vec<T>, CrmError> {
    records
        .into_iter()
        .map(|r| decode_record(endpoint, r))
        .collect()
}

pub fn decode_record<T: DeserializeOwned>(endpoint: &str, record: CrmRecord) -> Result<T, CrmError> {
    serde_json::from_value(record).map_err(|source| CrmError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub base_url: String,
    pub api_token: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct HttpCrmGateway {
    http: reqwest::Client,
    base_url: Url,
}

/// Ids do CRM viram um único segmento de caminho; `.`/`..` e vazios são recusados.
fn checked_id(crm_id: &str) -> Result<&str, CrmError> {
    let trimmed = crm_id.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(CrmError::InvalidId(crm_id.to_string()));
    }
    Ok(crm_id)
}

impl HttpCrmGateway {
    pub fn new(config: CrmConfig) -> Result<Self, CrmError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|_| CrmError::Config("token com caracteres inválidos".into()))?,
        );

        // Timeout limitado: expirar conta como falha do gateway
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|source| CrmError::Http {
                endpoint: "client_init".into(),
                source,
            })?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| CrmError::Config(format!("CRM_BASE_URL inválida: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CrmError::Config(format!("CRM_BASE_URL inválida: {}", base_url)));
        }

        Ok(Self { http, base_url })
    }

    /// Monta a URL segmento a segmento; cada um é codificado (inclusive `/`).
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response, CrmError> {
        request.send().await.map_err(|source| CrmError::Http {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, CrmError> {
        let status = response.status();
        let body = response.text().await.map_err(|source| CrmError::Http {
            endpoint: endpoint.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(CrmError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|source| CrmError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl CrmGateway for HttpCrmGateway {
    async fn fetch_entity(
        &self,
        entity: CrmEntityType,
        crm_id: &str,
    ) -> Result<Option<CrmRecord>, CrmError> {
        let crm_id = checked_id(crm_id)?;
        let endpoint = format!("{}/{}", entity.path(), crm_id);
        let url = self.url(&[entity.path(), crm_id]);
        let response = self.send(&endpoint, self.http.get(url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.read_json(&endpoint, response).await.map(Some)
    }

    async fn search_entities(
        &self,
        entity: CrmEntityType,
        keyword: &str,
    ) -> Result<Vec<CrmRecord>, CrmError> {
        let endpoint = format!("{}/search", entity.path());
        let request = self
            .http
            .get(self.url(&[entity.path(), "search"]))
            .query(&[("keyword", keyword)]);
        let response = self.send(&endpoint, request).await?;
        self.read_json(&endpoint, response).await
    }

    async fn list_child_records(
        &self,
        entity: CrmEntityType,
        parent_crm_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<CrmPage, CrmError> {
        let endpoint = entity.path();
        let request = self.http.get(self.url(&[endpoint])).query(&[
            ("parentId", parent_crm_id.to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ]);
        let response = self.send(endpoint, request).await?;
        self.read_json(endpoint, response).await
    }

    async fn create_record(
        &self,
        entity: CrmEntityType,
        fields: &Value,
    ) -> Result<CrmRecord, CrmError> {
        let endpoint = entity.path();
        let request = self.http.post(self.url(&[endpoint])).json(fields);
        let response = self.send(endpoint, request).await?;
        self.read_json(endpoint, response).await
    }

    async fn upload_document(
        &self,
        parent_crm_id: &str,
        parent_type: CrmEntityType,
        upload: DocumentUpload,
    ) -> Result<Value, CrmError> {
        let endpoint = "documents/upload";

        let part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)
            .map_err(|source| CrmError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let mut form = multipart::Form::new()
            .text("parentId", parent_crm_id.to_string())
            .text("parentType", parent_type.path())
            .part("file", part);
        if let Some(description) = upload.description {
            form = form.text("description", description);
        }

        let request = self
            .http
            .post(self.url(&["documents", "upload"]))
            .multipart(form);
        let response = self.send(endpoint, request).await?;
        self.read_json(endpoint, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> HttpCrmGateway {
        HttpCrmGateway::new(CrmConfig {
            base_url: server.uri(),
            api_token: "test-token".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_entity_sends_bearer_and_returns_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts/ACC-1"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ACC-1",
                "name": "Acme Pty Ltd"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = gateway(&server)
            .fetch_entity(CrmEntityType::Account, "ACC-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record["name"], "Acme Pty Ltd");
    }

    #[tokio::test]
    async fn fetch_entity_maps_404_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let record = gateway(&server)
            .fetch_entity(CrmEntityType::Account, "missing")
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn fetch_entity_keeps_the_id_inside_its_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"secret": true})))
            .expect(0)
            .mount(&server)
            .await;

        let record = gateway(&server)
            .fetch_entity(CrmEntityType::Account, "../users/42")
            .await
            .unwrap();
        assert!(record.is_none());

        let requested: Vec<String> = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        assert_eq!(requested, vec!["/accounts/..%2Fusers%2F42".to_string()]);
    }

    #[tokio::test]
    async fn dot_segments_are_rejected_before_calling_the_crm() {
        let server = MockServer::start().await;
        let gateway = gateway(&server);
        for id in ["..", ".", "  "] {
            let err = gateway.fetch_entity(CrmEntityType::Account, id).await.unwrap_err();
            assert!(matches!(err, CrmError::InvalidId(_)));
        }
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[test]
    fn base_url_with_prefix_keeps_its_path() {
        let gateway = HttpCrmGateway::new(CrmConfig {
            base_url: "https://crm.example.test/api/v1/".into(),
            api_token: "t".into(),
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(
            gateway.url(&["accounts", "ACC 1"]).as_str(),
            "https://crm.example.test/api/v1/accounts/ACC%201"
        );
    }

    #[tokio::test]
    async fn list_child_records_passes_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contacts"))
            .and(query_param("parentId", "ACC-1"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "25"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "list": [{"id": "C-1", "firstName": "Jane"}],
                "totalCount": 26
            })))
            .mount(&server)
            .await;

        let page = gateway(&server)
            .list_child_records(CrmEntityType::Contact, "ACC-1", 2, 25)
            .await
            .unwrap();
        assert_eq!(page.total_count, 26);
        assert_eq!(page.list.len(), 1);
    }

    #[tokio::test]
    async fn server_errors_surface_as_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/claims"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .create_record(CrmEntityType::Claim, &json!({"name": "x"}))
            .await
            .unwrap_err();
        match err {
            CrmError::UnexpectedStatus { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/claims/search"))
            .and(query_param("keyword", "acme"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .search_entities(CrmEntityType::Claim, "acme")
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Decode { .. }));
    }

    #[tokio::test]
    async fn upload_document_posts_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents/upload"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let ack = gateway(&server)
            .upload_document(
                "CLM-9",
                CrmEntityType::Claim,
                DocumentUpload {
                    file_name: "invoice.pdf".into(),
                    content_type: "application/pdf".into(),
                    bytes: b"%PDF-1.4".to_vec(),
                    description: Some("Fatura".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(ack["ok"], true);
    }
}
