use async_trait::async_trait;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;

use kickfeed_core::resources::{NewsResource, TransferResource};
use kickfeed_core::sync::{ChangeListEntry, ResourceNetworkDataSource};

use crate::config::NetworkConfig;
use crate::error::{NetworkError, Result};
use crate::types::{NetworkChangeList, NetworkNewsResource, NetworkTransferResource};

const MAX_LOG_BODY_CHARS: usize = 512;

const NEWS_PATH: &str = "news";
const TRANSFERS_PATH: &str = "transfers";
const NEWS_CHANGE_LIST_PATH: &str = "news-network-change-list";
const TRANSFERS_CHANGE_LIST_PATH: &str = "transfers-network-change-list";

/// Read-only client for the kickfeed backend.
#[derive(Debug, Clone)]
pub struct KickfeedNetworkClient {
    client: reqwest::Client,
    base_url: String,
}

impl KickfeedNetworkClient {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn log_response(path: &str, status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[Network] GET /{} -> {}", path, status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        warn!("[Network] GET /{} -> {}: {}", path, status, preview);
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(path, status, &body);

        if !status.is_success() {
            return Err(NetworkError::api(
                status.as_u16(),
                format!("Request failed: {}", body.trim()),
            ));
        }

        serde_json::from_str(&body).map_err(|err| {
            error!("[Network] Failed to parse /{} response: {}", path, err);
            NetworkError::from(err)
        })
    }

    /// `ids` go out as one comma-separated `id` parameter; `None` asks for all.
    fn id_query(ids: Option<&[String]>) -> Vec<(&'static str, String)> {
        ids.map(|ids| vec![("id", ids.join(","))]).unwrap_or_default()
    }

    fn after_query(after: Option<i64>) -> Vec<(&'static str, String)> {
        after
            .map(|version| vec![("after", version.to_string())])
            .unwrap_or_default()
    }

    pub async fn get_news(&self, ids: Option<&[String]>) -> Result<Vec<NetworkNewsResource>> {
        self.get(NEWS_PATH, &Self::id_query(ids)).await
    }

    pub async fn get_transfers(
        &self,
        ids: Option<&[String]>,
    ) -> Result<Vec<NetworkTransferResource>> {
        self.get(TRANSFERS_PATH, &Self::id_query(ids)).await
    }

    pub async fn get_news_change_list(
        &self,
        after: Option<i64>,
    ) -> Result<Vec<NetworkChangeList>> {
        self.get(NEWS_CHANGE_LIST_PATH, &Self::after_query(after)).await
    }

    pub async fn get_transfer_change_list(
        &self,
        after: Option<i64>,
    ) -> Result<Vec<NetworkChangeList>> {
        self.get(TRANSFERS_CHANGE_LIST_PATH, &Self::after_query(after))
            .await
    }
}

fn into_entries(entries: Vec<NetworkChangeList>) -> Vec<ChangeListEntry> {
    entries.into_iter().map(ChangeListEntry::from).collect()
}

#[async_trait]
impl ResourceNetworkDataSource<NewsResource> for KickfeedNetworkClient {
    async fn get_resources(
        &self,
        ids: Option<&[String]>,
    ) -> kickfeed_core::Result<Vec<NewsResource>> {
        let payloads = self.get_news(ids).await?;
        let news = payloads
            .into_iter()
            .map(NewsResource::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(news)
    }

    async fn get_change_list(
        &self,
        after: Option<i64>,
    ) -> kickfeed_core::Result<Vec<ChangeListEntry>> {
        Ok(into_entries(self.get_news_change_list(after).await?))
    }
}

#[async_trait]
impl ResourceNetworkDataSource<TransferResource> for KickfeedNetworkClient {
    async fn get_resources(
        &self,
        ids: Option<&[String]>,
    ) -> kickfeed_core::Result<Vec<TransferResource>> {
        let payloads = self.get_transfers(ids).await?;
        Ok(payloads.into_iter().map(TransferResource::from).collect())
    }

    async fn get_change_list(
        &self,
        after: Option<i64>,
    ) -> kickfeed_core::Result<Vec<ChangeListEntry>> {
        Ok(into_entries(self.get_transfer_change_list(after).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kickfeed_core::errors::RetryClass;
    use kickfeed_core::Error;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves one canned response and hands back the request line.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let request = String::from_utf8_lossy(&request);
            let line = request.lines().next().unwrap_or_default().to_string();
            let _ = tx.send(line);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        (format!("http://{addr}/"), rx)
    }

    fn client(base_url: &str) -> KickfeedNetworkClient {
        KickfeedNetworkClient::new(&NetworkConfig::new(base_url)).unwrap()
    }

    #[tokio::test]
    async fn news_by_id_sends_csv_and_converts() {
        let (url, request) = serve_once(
            "200 OK",
            r#"[{"id":5,"title":"t","body":"b","category":1,"isImportant":"false",
                "link":"l","tags":"cup","date":"2024-05-01","time":"12:00"}]"#,
        )
        .await;
        let ids = vec!["5".to_string(), "8".to_string()];
        let api = client(&url);
        let news = ResourceNetworkDataSource::<NewsResource>::get_resources(&api, Some(&ids[..]))
            .await
            .unwrap();

        assert_eq!(request.await.unwrap(), "GET /news?id=5%2C8 HTTP/1.1");
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].id, "5");
        assert_eq!(news[0].topics, vec!["cup"]);
    }

    #[tokio::test]
    async fn full_change_list_omits_after() {
        let (url, request) = serve_once(
            "200 OK",
            r#"[{"id":3,"changeListVersion":4,"isDelete":true}]"#,
        )
        .await;
        let entries =
            ResourceNetworkDataSource::<TransferResource>::get_change_list(&client(&url), None)
                .await
                .unwrap();

        assert_eq!(
            request.await.unwrap(),
            "GET /transfers-network-change-list HTTP/1.1"
        );
        assert_eq!(
            entries,
            vec![ChangeListEntry {
                id: "3".to_string(),
                change_list_version: 4,
                is_delete: true,
            }]
        );
    }

    #[tokio::test]
    async fn incremental_change_list_sends_after() {
        let (url, request) = serve_once("200 OK", "[]").await;
        let entries = client(&url).get_news_change_list(Some(11)).await.unwrap();

        assert_eq!(
            request.await.unwrap(),
            "GET /news-network-change-list?after=11 HTTP/1.1"
        );
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let (url, _request) = serve_once("503 Service Unavailable", "maintenance").await;
        let api = client(&url);
        let err = ResourceNetworkDataSource::<NewsResource>::get_change_list(&api, Some(1))
            .await
            .unwrap_err();

        match err {
            Error::Network(failure) => {
                assert_eq!(failure.status, Some(503));
                assert_eq!(failure.retry_class, RetryClass::Retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_body_is_permanent() {
        let (url, _request) = serve_once("200 OK", "{not json").await;
        let api = client(&url);
        let err = ResourceNetworkDataSource::<TransferResource>::get_resources(&api, None)
            .await
            .unwrap_err();

        assert_eq!(err.retry_class(), RetryClass::Permanent);
    }
}
