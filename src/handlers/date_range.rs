// src/handlers/date_range.rs

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::common::error::AppError;

/// Limite de período vindo da query string: instante RFC 3339 ou só a data.
/// Data pura no início vale 00:00:00; no fim, o último instante do dia.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DateBound {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

impl DateBound {
    pub fn as_start(self) -> DateTime<Utc> {
        match self {
            DateBound::Instant(at) => at,
            DateBound::Day(day) => day.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// Falha só nos extremos do calendário do chrono (sem "dia seguinte").
    pub fn as_end(self) -> Result<DateTime<Utc>, AppError> {
        match self {
            DateBound::Instant(at) => Ok(at),
            DateBound::Day(day) => day
                .and_time(NaiveTime::MIN)
                .and_utc()
                .checked_add_signed(Duration::days(1))
                .and_then(|next| next.checked_sub_signed(Duration::microseconds(1)))
                .ok_or_else(out_of_range),
        }
    }
}

fn out_of_range() -> AppError {
    AppError::BadRequest("Data fora do intervalo suportado.".to_string())
}

/// Os dois limites juntos, ou nenhum.
pub fn optional_range(
    start: Option<DateBound>,
    end: Option<DateBound>,
) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, AppError> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some((start.as_start(), end.as_end()?))),
        (None, None) => Ok(None),
        _ => Err(AppError::BadRequest(
            "Informe 'start' e 'end' juntos.".to_string(),
        )),
    }
}

/// Período com padrão dos últimos 30 dias até agora.
pub fn range_or_last_30_days(
    start: Option<DateBound>,
    end: Option<DateBound>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let end = match end {
        Some(end) => end.as_end()?,
        None => now,
    };
    let start = match start {
        Some(start) => start.as_start(),
        None => end
            .checked_sub_signed(Duration::days(30))
            .ok_or_else(out_of_range)?,
    };
    Ok((start, end))
}
