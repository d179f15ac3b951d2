//! Analytics: metric series per dimension tuple (`/v1/analytics/data`)

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{query_builder::Separated, Postgres};

use super::fetch::{self, FetchError};
use super::observer::PipelineEvent;
use super::request;
use super::store::{ImportRow, Owned, RowBatch};
use super::{Resource, SellerContext};
use crate::marketplace::Credentials;

pub const PATH: &str = "/v1/analytics/data";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_LIMIT: u32 = 1000;

/// Metric columns every analytics row carries, in column order
pub const METRIC_TEMPLATE: [&str; 18] = [
    "revenue",
    "ordered_units",
    "unknown_metric",
    "hits_view_pdp",
    "hits_view",
    "hits_tocart_search",
    "hits_tocart_pdp",
    "hits_tocart",
    "session_view_search",
    "session_view_pdp",
    "session_view",
    "conv_tocart_search",
    "conv_tocart_pdp",
    "conv_tocart",
    "returns",
    "cancellations",
    "delivered_units",
    "position_category",
];

/// Partial request as sent by the caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsRequest {
    #[serde(alias = "datefrom")]
    pub date_from: Option<String>,
    #[serde(alias = "dateto")]
    pub date_to: Option<String>,
    pub dimension: Option<Vec<String>>,
    pub filters: Option<Vec<Value>>,
    pub sort: Option<Vec<Value>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub metrics: Option<Vec<String>>,
}

/// Fully resolved upstream request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsQuery {
    pub date_from: String,
    pub date_to: String,
    pub dimension: Vec<String>,
    pub filters: Vec<Value>,
    pub sort: Vec<Value>,
    pub limit: u32,
    pub offset: u32,
    pub metrics: Vec<String>,
}

pub fn resolve(request: AnalyticsRequest, today: NaiveDate) -> AnalyticsQuery {
    AnalyticsQuery {
        date_from: request::text(
            request.date_from,
            request::month_before(today).format(DATE_FORMAT).to_string(),
        ),
        date_to: request::text(request.date_to, today.format(DATE_FORMAT).to_string()),
        dimension: request::list(request.dimension, || vec!["sku".into(), "day".into()]),
        filters: request::list(request.filters, Vec::new),
        sort: request::list(request.sort, || vec![Value::Object(Default::default())]),
        limit: request::count(request.limit, DEFAULT_LIMIT),
        offset: request.offset.unwrap_or(0),
        metrics: request::list(request.metrics, || {
            vec!["revenue".into(), "ordered_units".into()]
        })
        .into_iter()
        .map(|m| m.trim().to_string())
        .collect(),
    }
}

#[derive(Debug, Deserialize)]
struct AnalyticsPage {
    #[serde(default)]
    data: Vec<AnalyticsItem>,
}

/// One upstream data point: dimension descriptors plus values aligned with the
/// requested metric list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsItem {
    #[serde(default)]
    pub dimensions: Value,
    #[serde(default)]
    pub metrics: Vec<Option<f64>>,
}

/// The fixed metric template, zero unless the upstream reported a value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricValues {
    pub revenue: f64,
    pub ordered_units: f64,
    pub unknown_metric: f64,
    pub hits_view_pdp: f64,
    pub hits_view: f64,
    pub hits_tocart_search: f64,
    pub hits_tocart_pdp: f64,
    pub hits_tocart: f64,
    pub session_view_search: f64,
    pub session_view_pdp: f64,
    pub session_view: f64,
    pub conv_tocart_search: f64,
    pub conv_tocart_pdp: f64,
    pub conv_tocart: f64,
    pub returns: f64,
    pub cancellations: f64,
    pub delivered_units: f64,
    pub position_category: f64,
}

impl MetricValues {
    fn slot(&mut self, name: &str) -> Option<&mut f64> {
        let slot = match name {
            "revenue" => &mut self.revenue,
            "ordered_units" => &mut self.ordered_units,
            "unknown_metric" => &mut self.unknown_metric,
            "hits_view_pdp" => &mut self.hits_view_pdp,
            "hits_view" => &mut self.hits_view,
            "hits_tocart_search" => &mut self.hits_tocart_search,
            "hits_tocart_pdp" => &mut self.hits_tocart_pdp,
            "hits_tocart" => &mut self.hits_tocart,
            "session_view_search" => &mut self.session_view_search,
            "session_view_pdp" => &mut self.session_view_pdp,
            "session_view" => &mut self.session_view,
            "conv_tocart_search" => &mut self.conv_tocart_search,
            "conv_tocart_pdp" => &mut self.conv_tocart_pdp,
            "conv_tocart" => &mut self.conv_tocart,
            "returns" => &mut self.returns,
            "cancellations" => &mut self.cancellations,
            "delivered_units" => &mut self.delivered_units,
            "position_category" => &mut self.position_category,
            _ => return None,
        };
        Some(slot)
    }

    /// Set a template metric; false when `name` is not part of the template
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.slot(name) {
            Some(slot) => {
                *slot = value;
                true
            },
            None => false,
        }
    }

    /// Values in [`METRIC_TEMPLATE`] order
    pub fn in_template_order(&self) -> [f64; 18] {
        [
            self.revenue,
            self.ordered_units,
            self.unknown_metric,
            self.hits_view_pdp,
            self.hits_view,
            self.hits_tocart_search,
            self.hits_tocart_pdp,
            self.hits_tocart,
            self.session_view_search,
            self.session_view_pdp,
            self.session_view,
            self.conv_tocart_search,
            self.conv_tocart_pdp,
            self.conv_tocart,
            self.returns,
            self.cancellations,
            self.delivered_units,
            self.position_category,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsRow {
    /// Dimension descriptors as opaque text
    pub dimensions: String,
    #[serde(flatten)]
    pub metrics: MetricValues,
}

/// Reshaped rows plus the metric names that fell outside the template
#[derive(Debug, Default)]
pub struct Reshaped {
    pub rows: Vec<AnalyticsRow>,
    pub dropped: Vec<String>,
}

/// Pair each value with the metric name at the same index and overlay the template
pub fn reshape(metrics: &[String], items: Vec<AnalyticsItem>) -> seller_common::Result<Reshaped> {
    let mut reshaped = Reshaped::default();

    for item in items {
        let mut values = MetricValues::default();
        for (name, value) in metrics.iter().zip(item.metrics) {
            let known = values.set(name, value.unwrap_or(0.0));
            if !known && !reshaped.dropped.contains(name) {
                reshaped.dropped.push(name.clone());
            }
        }
        reshaped.rows.push(AnalyticsRow {
            dimensions: seller_common::encode_opaque(&item.dimensions)?,
            metrics: values,
        });
    }

    Ok(reshaped)
}

pub async fn fetch(
    ctx: &SellerContext,
    owner_id: i64,
    credentials: &Credentials,
    request: AnalyticsRequest,
) -> Result<Vec<AnalyticsRow>, FetchError> {
    let resource = Resource::Analytics;
    let auth = fetch::authorize(ctx, resource, owner_id, credentials).await?;
    let query = resolve(request, Utc::now().date_naive());

    ctx.observer.on_event(PipelineEvent::FetchStarted { resource });
    let outcome = async {
        let page: AnalyticsPage = ctx.marketplace.post(PATH, &auth, &query).await?;
        ctx.observer.on_event(PipelineEvent::PageFetched {
            resource,
            page: 1,
            items: page.data.len(),
        });
        Ok::<_, FetchError>(reshape(&query.metrics, page.data)?)
    }
    .await;

    match outcome {
        Ok(reshaped) => {
            for metric in reshaped.dropped {
                ctx.observer.on_event(PipelineEvent::MetricDropped { resource, metric });
            }
            ctx.observer.on_event(PipelineEvent::Reshaped {
                resource,
                rows: reshaped.rows.len(),
            });
            Ok(reshaped.rows)
        },
        Err(err) => Err(fetch::abort(ctx, resource, owner_id, err).await),
    }
}

impl ImportRow for AnalyticsRow {
    const RESOURCE: Resource = Resource::Analytics;
    const COLUMNS: &'static [&'static str] = &[
        "dimensions",
        "revenue",
        "ordered_units",
        "unknown_metric",
        "hits_view_pdp",
        "hits_view",
        "hits_tocart_search",
        "hits_tocart_pdp",
        "hits_tocart",
        "session_view_search",
        "session_view_pdp",
        "session_view",
        "conv_tocart_search",
        "conv_tocart_pdp",
        "conv_tocart",
        "returns",
        "cancellations",
        "delivered_units",
        "position_category",
    ];

    fn bind_values(&self, row: &mut Separated<'_, 'static, Postgres, &'static str>) {
        row.push_bind(self.dimensions.clone());
        for value in self.metrics.in_template_order() {
            row.push_bind(value);
        }
    }

    fn into_batch(rows: Vec<Owned<Self>>) -> RowBatch {
        RowBatch::Analytics(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_defaults() {
        let query = resolve(AnalyticsRequest::default(), day(2024, 5, 15));
        assert_eq!(query.date_from, "2024-04-15");
        assert_eq!(query.date_to, "2024-05-15");
        assert_eq!(query.dimension, vec!["sku", "day"]);
        assert!(query.filters.is_empty());
        assert_eq!(query.sort, vec![json!({})]);
        assert_eq!(query.limit, 1000);
        assert_eq!(query.offset, 0);
        assert_eq!(query.metrics, vec!["revenue", "ordered_units"]);
    }

    #[test]
    fn test_resolve_keeps_caller_values_and_legacy_names() {
        let request: AnalyticsRequest = serde_json::from_value(json!({
            "datefrom": "2024-01-01",
            "dateto": "2024-01-31",
            "metrics": ["hits_view"],
            "limit": 0,
            "offset": 20
        }))
        .unwrap();
        let query = resolve(request, day(2024, 5, 15));
        assert_eq!(query.date_from, "2024-01-01");
        assert_eq!(query.date_to, "2024-01-31");
        assert_eq!(query.metrics, vec!["hits_view"]);
        assert_eq!(query.limit, 1000);
        assert_eq!(query.offset, 20);
    }

    #[test]
    fn test_reshape_pairs_metrics_by_index() {
        let metrics = vec!["revenue".to_string(), "ordered_units".to_string()];
        let items = vec![AnalyticsItem {
            dimensions: json!([{"id": "123", "name": "Mug"}, {"id": "2024-05-01"}]),
            metrics: vec![Some(100.0), Some(5.0)],
        }];

        let reshaped = reshape(&metrics, items).unwrap();
        let row = &reshaped.rows[0];
        assert_eq!(row.metrics.revenue, 100.0);
        assert_eq!(row.metrics.ordered_units, 5.0);
        assert_eq!(row.metrics.hits_view, 0.0);
        assert_eq!(row.dimensions, r#"[{"id":"123","name":"Mug"},{"id":"2024-05-01"}]"#);
        assert!(reshaped.dropped.is_empty());
    }

    #[test]
    fn test_reshape_drops_unknown_and_keeps_zero_for_missing() {
        let metrics = vec![
            "revenue".to_string(),
            "adv_sum_all".to_string(),
            "returns".to_string(),
        ];
        let items = vec![
            AnalyticsItem {
                dimensions: Value::Null,
                metrics: vec![Some(1.5), Some(9.0)],
            },
            AnalyticsItem {
                dimensions: json!([]),
                metrics: vec![None, Some(3.0), Some(2.0)],
            },
        ];

        let reshaped = reshape(&metrics, items).unwrap();
        assert_eq!(reshaped.dropped, vec!["adv_sum_all"]);
        assert_eq!(reshaped.rows[0].metrics.revenue, 1.5);
        assert_eq!(reshaped.rows[0].metrics.returns, 0.0);
        assert_eq!(reshaped.rows[0].dimensions, "null");
        assert_eq!(reshaped.rows[1].metrics.revenue, 0.0);
        assert_eq!(reshaped.rows[1].metrics.returns, 2.0);
        assert_eq!(reshaped.rows[1].dimensions, "null");
    }

    #[test]
    fn test_row_serializes_flat() {
        let row = AnalyticsRow {
            dimensions: "null".into(),
            metrics: MetricValues::default(),
        };
        let value = serde_json::to_value(&row).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 19);
        for name in METRIC_TEMPLATE {
            assert!(object.contains_key(name), "missing {}", name);
        }
    }

    #[test]
    fn test_columns_match_template() {
        assert_eq!(&AnalyticsRow::COLUMNS[1..], &METRIC_TEMPLATE[..]);
    }
}
