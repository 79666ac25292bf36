//! Downstream notification of newly available products.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use sentinel_common::Product;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::config_loader::PublishConfig;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(30);

/// Announces a finished product mosaic to some consumer.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, product: &Product) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Posts one urlencoded form per product to `url + endPoint`.
pub struct HttpPublisher {
    client: Client,
    resource: String,
    fields: Vec<(String, String)>,
}

impl HttpPublisher {
    pub fn new(config: &PublishConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(PUBLISH_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let fields = config
            .extra
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect();

        Ok(Self {
            client,
            resource: config.resource(),
            fields,
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Configured extra fields plus `productName` and `newDate`.
    pub fn form_fields(&self, product: &Product) -> Vec<(String, String)> {
        let mut form = self.fields.clone();
        form.push(("productName".to_string(), product.name.clone()));
        form.push(("newDate".to_string(), product.new_date.to_string()));
        form
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    #[instrument(skip(self, product), fields(product = %product.name, date = %product.new_date))]
    async fn publish(&self, product: &Product) -> Result<()> {
        let response = self
            .client
            .post(&self.resource)
            .form(&self.form_fields(product))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.resource))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} answered {}: {}", self.resource, status, body.trim());
        }

        info!(status = %status, "Published product");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Logs products instead of notifying anyone. Used with `--no-publish` or
/// when no `publish` section is configured.
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, product: &Product) -> Result<()> {
        info!(
            product = %product.name,
            date = %product.new_date,
            mosaic = %product.mosaic_path.display(),
            "Product available (not published)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

pub fn publisher_for(config: Option<&PublishConfig>, disabled: bool) -> Result<Box<dyn Publisher>> {
    match config {
        Some(config) if !disabled => Ok(Box::new(HttpPublisher::new(config)?)),
        _ => Ok(Box::new(LogPublisher)),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub published: usize,
    pub failed: usize,
}

/// Publish every product in order. A failed notification is logged and
/// does not stop the rest.
pub async fn publish_all(publisher: &dyn Publisher, products: &[Product]) -> PublishSummary {
    let mut summary = PublishSummary::default();

    for product in products {
        match publisher.publish(product).await {
            Ok(()) => summary.published += 1,
            Err(e) => {
                error!(
                    publisher = publisher.name(),
                    product = %product.name,
                    error = %format!("{:#}", e),
                    "Failed to publish product"
                );
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn product(name: &str) -> Product {
        Product {
            name: name.to_string(),
            new_date: "20240115".parse().unwrap(),
            mosaic_path: PathBuf::from(format!("/out/{}/mosaic.vrt", name)),
        }
    }

    fn publish_config() -> PublishConfig {
        let mut extra = BTreeMap::new();
        extra.insert("token".to_string(), serde_json::json!("secret"));
        extra.insert("layer".to_string(), serde_json::json!(7));
        PublishConfig {
            url: "http://localhost:9".to_string(),
            end_point: "/api/newDate".to_string(),
            extra,
        }
    }

    struct FlakyPublisher {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Publisher for FlakyPublisher {
        async fn publish(&self, product: &Product) -> Result<()> {
            self.seen.lock().unwrap().push(product.name.clone());
            if product.name == "NDWI" {
                anyhow::bail!("endpoint down");
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[test]
    fn test_form_fields_append_product() {
        let publisher = HttpPublisher::new(&publish_config()).unwrap();
        assert_eq!(publisher.resource(), "http://localhost:9/api/newDate");

        let form = publisher.form_fields(&product("NDVI"));
        assert_eq!(
            form,
            vec![
                ("layer".to_string(), "7".to_string()),
                ("token".to_string(), "secret".to_string()),
                ("productName".to_string(), "NDVI".to_string()),
                ("newDate".to_string(), "20240115".to_string()),
            ]
        );
    }

    #[test]
    fn test_publisher_selection() {
        let config = publish_config();
        assert_eq!(publisher_for(Some(&config), false).unwrap().name(), "http");
        assert_eq!(publisher_for(Some(&config), true).unwrap().name(), "log");
        assert_eq!(publisher_for(None, false).unwrap().name(), "log");
    }

    #[test]
    fn test_publish_all_continues_after_failure() {
        let publisher = FlakyPublisher {
            seen: Mutex::new(Vec::new()),
        };
        let products = vec![product("NDVI"), product("NDWI"), product("EVI")];

        let summary = tokio_test::block_on(publish_all(&publisher, &products));

        assert_eq!(summary, PublishSummary { published: 2, failed: 1 });
        assert_eq!(*publisher.seen.lock().unwrap(), vec!["NDVI", "NDWI", "EVI"]);
    }

    #[test]
    fn test_log_publisher_never_fails() {
        let summary = tokio_test::block_on(publish_all(&LogPublisher, &[product("NDMI")]));
        assert_eq!(summary.published, 1);
    }
}
