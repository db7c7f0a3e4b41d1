use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;

/// Format an [`OffsetDateTime`] in the canonical UTC display format.
pub fn format_datetime_utc(dt: OffsetDateTime) -> String {
    format!(
        "{:02} {} {:04} at {:02}:{:02}",
        dt.day(),
        short_month(dt.month()),
        dt.year(),
        dt.hour(),
        dt.minute()
    )
}

fn short_month(month: time::Month) -> &'static str {
    use time::Month::*;
    match month {
        January => "Jan",
        February => "Feb",
        March => "Mar",
        April => "Apr",
        May => "May",
        June => "Jun",
        July => "Jul",
        August => "Aug",
        September => "Sep",
        October => "Oct",
        November => "Nov",
        December => "Dec",
    }
}

/// Canonical application server error response body.
pub fn server_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Unable to process your request. Please try again later.",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_in_utc() {
        assert_eq!(
            format_datetime_utc(datetime!(2024-03-17 10:15 UTC)),
            "17 Mar 2024 at 10:15"
        );
    }

    #[test]
    fn pads_single_digit_fields() {
        assert_eq!(
            format_datetime_utc(datetime!(2023-01-05 03:07 UTC)),
            "05 Jan 2023 at 03:07"
        );
    }
}
