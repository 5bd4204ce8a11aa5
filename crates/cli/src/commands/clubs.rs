//! Club commands: list, show, events, members, join, subscribe.

use anyhow::Result;

use crate::output;

use super::CommandContext;

pub async fn list(ctx: &CommandContext, search: Option<String>) -> Result<()> {
    let mut clubs = ctx.client.clubs().list().await?;
    if let Some(query) = &search {
        clubs.retain(|club| super::matches_search(&[&club.name, &club.description], query));
    }

    if clubs.is_empty() {
        output::muted("No clubs found");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = clubs
        .iter()
        .map(|club| {
            vec![
                club.id.to_string(),
                club.name.clone(),
                output::format_date(&club.created_at),
            ]
        })
        .collect();
    output::table(&["ID", "NAME", "CREATED"], &rows);
    Ok(())
}

pub async fn show(ctx: &CommandContext, id: i64) -> Result<()> {
    let club = ctx.client.clubs().get(id).await?;
    println!("\x1b[1m{}\x1b[0m  (club #{})", club.name, club.id);
    println!("{}", club.description);
    output::muted(&format!("Created {}", output::format_date(&club.created_at)));
    Ok(())
}

pub async fn events(ctx: &CommandContext, id: i64) -> Result<()> {
    let events = ctx.client.clubs().events(id).await?;
    if events.is_empty() {
        output::muted("No events scheduled for this club");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = events
        .iter()
        .map(|event| {
            vec![
                event.id.to_string(),
                event.title.clone(),
                output::format_date(&event.start_date),
                output::format_price(event),
                output::format_availability(event),
            ]
        })
        .collect();
    output::table(&["ID", "TITLE", "STARTS", "PRICE", "TICKETS"], &rows);
    Ok(())
}

pub async fn members(ctx: &CommandContext, id: i64) -> Result<()> {
    let members = ctx.client.clubs().members(id).await?;
    if members.is_empty() {
        output::muted("This club has no members yet");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = members
        .iter()
        .map(|member| {
            vec![
                member.username.clone(),
                member.role.clone(),
                output::format_date(&member.joined_at),
            ]
        })
        .collect();
    output::table(&["USERNAME", "ROLE", "JOINED"], &rows);
    Ok(())
}

pub async fn join(ctx: &CommandContext, id: i64) -> Result<()> {
    let membership = ctx.client.clubs().join(id).await?;
    output::success(&format!(
        "Joined {} as {}",
        membership.club_name, membership.role
    ));
    Ok(())
}

pub async fn subscribe(ctx: &CommandContext, id: i64) -> Result<()> {
    let subscription = ctx.client.clubs().subscribe(id).await?;
    output::success(&format!("Subscribed to {}", subscription.club_name));
    Ok(())
}
