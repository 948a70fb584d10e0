use axum::{
    extract::State,
    http::{header, header::HeaderValue, HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use csv::Writer;
use serde::Serialize;

use crate::domain::YieldRecord;
use crate::error::AppError;
use crate::gateway::PersistenceGateway;
use crate::AppState;

/// CSV row representation - uses String for amount to avoid Serialize issues
/// with BigDecimal.
#[derive(Serialize)]
struct YieldCsvRow {
    id: String,
    account_id: String,
    amount: String,
    source: String,
    created_at: String,
}

impl From<&YieldRecord> for YieldCsvRow {
    fn from(record: &YieldRecord) -> Self {
        YieldCsvRow {
            id: record.id.to_string(),
            account_id: record.account_id.to_string(),
            amount: record.amount.to_string(),
            source: record.source.clone(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

pub async fn export_yields(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let records = state
        .gateway
        .all_yield_records()
        .await
        .map_err(AppError::from)?;

    let mut wtr = Writer::from_writer(vec![]);
    for record in &records {
        wtr.serialize(YieldCsvRow::from(record))
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))?;

    let filename = format!("yields_{}.csv", Utc::now().format("%Y-%m"));
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
            .map_err(|e| AppError::Internal(e.to_string()))?,
    );

    Ok((StatusCode::OK, headers, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    #[test]
    fn test_yield_csv_row_from() {
        let record = YieldRecord::new(Uuid::new_v4(), BigDecimal::from(2), "accrual");
        let row = YieldCsvRow::from(&record);
        assert!(!row.id.is_empty());
        assert_eq!(row.amount, "2");
        assert_eq!(row.source, "accrual");
    }
}
