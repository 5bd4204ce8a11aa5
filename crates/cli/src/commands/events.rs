//! Event commands: list, show, reviews, review.

use anyhow::Result;
use clubhub_api::validate::validate_review;

use crate::output;

use super::CommandContext;

pub struct ListFilter {
    pub upcoming: bool,
    pub search: Option<String>,
    pub free: bool,
    pub paid: bool,
}

pub async fn list(ctx: &CommandContext, filter: ListFilter) -> Result<()> {
    let mut events = if filter.upcoming {
        ctx.client.events().upcoming().await?
    } else {
        ctx.client.events().list().await?
    };

    if let Some(query) = &filter.search {
        events.retain(|event| {
            super::matches_search(&[&event.title, &event.description, &event.club_name], query)
        });
    }
    if filter.free {
        events.retain(|event| event.is_free());
    }
    if filter.paid {
        events.retain(|event| !event.is_free());
    }

    if events.is_empty() {
        output::muted("No events found");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = events
        .iter()
        .map(|event| {
            vec![
                event.id.to_string(),
                event.title.clone(),
                event.club_name.clone(),
                output::format_date(&event.start_date),
                output::format_price(event),
                output::format_availability(event),
            ]
        })
        .collect();
    output::table(&["ID", "TITLE", "CLUB", "STARTS", "PRICE", "TICKETS"], &rows);
    Ok(())
}

pub async fn show(ctx: &CommandContext, id: i64) -> Result<()> {
    let event = ctx.client.events().get(id).await?;
    println!("\x1b[1m{}\x1b[0m  (event #{})", event.title, event.id);
    println!("{}", event.description);
    println!();
    println!("Club:     {}", event.club_name);
    println!("Room:     {}", event.room_name);
    println!(
        "When:     {} - {}",
        output::format_date(&event.start_date),
        output::format_date(&event.end_date)
    );
    println!("Price:    {}", output::format_price(&event));
    println!(
        "Tickets:  {} ({} of {} sold)",
        output::format_availability(&event),
        event.tickets_sold,
        event.total_tickets
    );
    Ok(())
}

pub async fn reviews(ctx: &CommandContext, id: i64) -> Result<()> {
    let reviews = ctx.client.events().reviews(id).await?;
    if reviews.is_empty() {
        output::muted("No reviews yet");
        return Ok(());
    }

    for review in &reviews {
        println!(
            "\x1b[1m{}\x1b[0m {} \x1b[90m{}\x1b[0m",
            review.user_username,
            output::stars(review.rating),
            output::format_date(&review.created_at)
        );
        println!("  {}", review.comment);
    }
    Ok(())
}

pub async fn review(ctx: &CommandContext, id: i64, rating: u8, comment: String) -> Result<()> {
    validate_review(rating, &comment)?;

    let review = ctx.client.events().create_review(id, rating, &comment).await?;
    output::success(&format!(
        "Review posted for {} ({})",
        review.event_title,
        output::stars(review.rating)
    ));
    Ok(())
}
