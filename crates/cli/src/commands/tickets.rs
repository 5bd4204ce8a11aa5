//! Ticket commands: list, buy, cancel.

use anyhow::{bail, Result};

use crate::output;

use super::CommandContext;

pub async fn list(ctx: &CommandContext) -> Result<()> {
    let tickets = ctx.client.tickets().list().await?;
    if tickets.is_empty() {
        output::muted("No tickets yet");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = tickets
        .iter()
        .map(|ticket| {
            vec![
                ticket.id.to_string(),
                ticket.event_title.clone(),
                output::format_date(&ticket.purchased_at),
            ]
        })
        .collect();
    output::table(&["ID", "EVENT", "PURCHASED"], &rows);
    Ok(())
}

/// Buy a ticket for an event.
///
/// The event is loaded first and a sold-out event is refused locally, so no
/// purchase request is ever issued for it. The server still re-checks
/// inventory and the wallet balance on the real request.
pub async fn buy(ctx: &CommandContext, event_id: i64) -> Result<()> {
    let event = ctx.client.events().get(event_id).await?;
    if event.is_sold_out() {
        bail!("{} is sold out", event.title);
    }

    let user = ctx.client.students().current().await?;
    let ticket = ctx.client.tickets().purchase(event.id, user.id).await?;
    output::success(&format!(
        "Ticket #{} purchased for {}",
        ticket.id, ticket.event_title
    ));
    if !event.is_free() {
        output::muted(&format!("Charged {}", output::format_price(&event)));
    }
    Ok(())
}

pub async fn cancel(ctx: &CommandContext, id: i64) -> Result<()> {
    ctx.client.tickets().cancel(id).await?;
    output::success(&format!("Ticket #{id} cancelled"));
    Ok(())
}
