//! Date helpers for prompt text, Peru-Spanish register.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Current local date in the shape prompts embed: `"17/10/2025 17:30 Viernes"`.
pub fn full_current_date() -> String {
    let now = chrono::Local::now();
    format!(
        "{} {}",
        now.format("%d/%m/%Y %H:%M"),
        weekday_name(now.weekday())
    )
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Lunes",
        Weekday::Tue => "Martes",
        Weekday::Wed => "Miércoles",
        Weekday::Thu => "Jueves",
        Weekday::Fri => "Viernes",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}

/// Resolve colloquial relative dates ("mañana", "el lunes") to `DD/MM/YYYY`.
///
/// Returns `None` when the text names no recognizable day.
pub fn parse_relative_date(input: &str) -> Option<String> {
    parse_relative_date_from(input, chrono::Local::now().date_naive())
}

fn parse_relative_date_from(input: &str, today: NaiveDate) -> Option<String> {
    let text = input.to_lowercase();

    // "pasado mañana" contains "mañana", so it has to win first.
    if text.contains("pasado mañana") {
        return format_date(today.checked_add_days(Days::new(2))?);
    }
    if text.contains("mañana") {
        return format_date(today.checked_add_days(Days::new(1))?);
    }
    if text.contains("hoy") {
        return format_date(today);
    }

    // Accent-tolerant weekday names, always resolving strictly forward.
    const WEEKDAYS: &[(&str, Weekday)] = &[
        ("domingo", Weekday::Sun),
        ("lunes", Weekday::Mon),
        ("martes", Weekday::Tue),
        ("miércoles", Weekday::Wed),
        ("miercoles", Weekday::Wed),
        ("jueves", Weekday::Thu),
        ("viernes", Weekday::Fri),
        ("sábado", Weekday::Sat),
        ("sabado", Weekday::Sat),
    ];
    for (name, day) in WEEKDAYS {
        if text.contains(name) {
            return format_date(next_weekday(today, *day));
        }
    }

    None
}

fn next_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let mut ahead = i64::from(target.num_days_from_monday())
        - i64::from(today.weekday().num_days_from_monday());
    ahead = ahead.rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    today + chrono::Duration::days(ahead)
}

fn format_date(date: NaiveDate) -> Option<String> {
    Some(date.format("%d/%m/%Y").to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn friday() -> NaiveDate {
        // 17/10/2025 was a Friday.
        NaiveDate::from_ymd_opt(2025, 10, 17).unwrap()
    }

    #[rstest]
    #[case("quiero hoy", "17/10/2025")]
    #[case("mañana temprano", "18/10/2025")]
    #[case("pasado mañana", "19/10/2025")]
    // "viernes" asked on a Friday means next week's Friday.
    #[case("el viernes", "24/10/2025")]
    #[case("para el lunes", "20/10/2025")]
    #[case("sabado", "18/10/2025")]
    fn resolves_relative_dates(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            parse_relative_date_from(input, friday()).as_deref(),
            Some(expected)
        );
    }

    #[test]
    fn weekday_accents_are_optional() {
        assert_eq!(
            parse_relative_date_from("el miércoles", friday()),
            parse_relative_date_from("el miercoles", friday()),
        );
    }

    #[test]
    fn unrelated_text_yields_none() {
        assert_eq!(parse_relative_date_from("a las 10am", friday()), None);
    }
}
