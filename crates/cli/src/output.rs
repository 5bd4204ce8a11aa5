//! Terminal output helpers: colored notices, plain-text tables, and the
//! date/price formats shared by every command.

use chrono::{DateTime, Utc};
use clubhub_api::Event;

pub fn success(message: &str) {
    println!("\x1b[1;32m✅ {message}\x1b[0m");
}

pub fn error(message: &str) {
    eprintln!("\x1b[1;31m❌ {message}\x1b[0m");
}

/// Secondary line under a notice, e.g. a follow-up command suggestion.
pub fn hint(message: &str) {
    eprintln!("   {message}");
}

pub fn muted(message: &str) {
    println!("\x1b[90m{message}\x1b[0m");
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_money(amount: f64) -> String {
    format!("${amount:.2}")
}

/// Price column for an event: "Free" or the dollar amount.
pub fn format_price(event: &Event) -> String {
    if event.is_free() {
        "Free".to_string()
    } else {
        format_money(event.ticket_price)
    }
}

/// "12 left" / "SOLD OUT" availability text.
pub fn format_availability(event: &Event) -> String {
    if event.is_sold_out() {
        "SOLD OUT".to_string()
    } else {
        format!("{} left", event.tickets_available)
    }
}

/// A 1-5 rating rendered as filled and hollow stars.
pub fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Print a left-aligned column table with a bold header row.
pub fn table(headers: &[&str], rows: &[Vec<String>]) {
    let lines = layout(headers, rows);
    let mut lines = lines.into_iter();
    if let Some(header) = lines.next() {
        println!("\x1b[1m{header}\x1b[0m");
    }
    for line in lines {
        println!("{line}");
    }
}

fn layout(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let render = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render(headers.to_vec())];
    for row in rows {
        lines.push(render(row.iter().map(String::as_str).collect()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(price: f64, ticket_type: &str, available: i64) -> Event {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Sample",
            "description": "",
            "club": 1,
            "club_name": "Club",
            "room": 1,
            "room_name": "A-1",
            "start_date": "2025-05-01T18:00:00Z",
            "end_date": "2025-05-01T20:00:00Z",
            "ticket_price": price,
            "ticket_type": ticket_type,
            "total_tickets": 50,
            "tickets_available": available,
            "tickets_sold": 50 - available,
            "image": null,
            "created_at": "2025-04-01T09:30:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_price_formats() {
        assert_eq!(format_price(&sample_event(0.0, "free", 10)), "Free");
        assert_eq!(format_price(&sample_event(12.5, "paid", 10)), "$12.50");
    }

    #[test]
    fn test_availability_formats() {
        assert_eq!(format_availability(&sample_event(5.0, "paid", 3)), "3 left");
        assert_eq!(format_availability(&sample_event(5.0, "paid", 0)), "SOLD OUT");
    }

    #[test]
    fn test_stars_clamped_to_five() {
        assert_eq!(stars(3), "★★★☆☆");
        assert_eq!(stars(5), "★★★★★");
        assert_eq!(stars(7), "★★★★★");
    }

    #[test]
    fn test_table_layout_pads_columns() {
        let rows = vec![
            vec!["1".to_string(), "Chess Club".to_string()],
            vec!["12".to_string(), "AI".to_string()],
        ];
        let lines = layout(&["ID", "NAME"], &rows);
        assert_eq!(lines[0], "ID  NAME");
        assert_eq!(lines[1], "1   Chess Club");
        assert_eq!(lines[2], "12  AI");
    }
}
