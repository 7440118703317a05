// Accounts and storefront
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod users;

// Clinic front desk
pub mod appointments;

// Clinical records (veterinarian only)
pub mod clinical_records;
pub mod consultations;
pub mod patients;
pub mod prescriptions;
pub mod treatments;
pub mod vaccines;

// Stock and reporting
pub mod dashboard;
pub mod inventory;
pub mod medication_egress;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};

/// Case-insensitive substring match, portable across SQLite and Postgres.
pub(crate) fn icontains<C: IntoColumnRef>(column: C, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", term.to_lowercase()))
}

/// UTC bounds `[start, end)` of a calendar day in the server's local zone.
pub(crate) fn local_day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = to_utc(day.and_time(NaiveTime::MIN));
    let end = to_utc(day.succ_opt().unwrap_or(day).and_time(NaiveTime::MIN));
    (start, end)
}

fn to_utc(naive: chrono::NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Trims optional free text, treating blank input as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
