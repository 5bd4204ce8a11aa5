//! Account commands: login, logout, whoami, register, verify-email.

use std::io::Write;

use anyhow::{Context, Result};
use clubhub_api::validate::validate_registration;
use clubhub_api::RegisterStudent;

use crate::output;

use super::CommandContext;

pub async fn login(ctx: &CommandContext, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let user = ctx.session.login(username, &password).await?;
    output::success(&format!("Logged in as {}", user.username));
    output::muted(&format!(
        "Wallet balance: {}",
        output::format_money(user.wallet_balance)
    ));
    Ok(())
}

pub fn logout(ctx: &CommandContext) {
    ctx.session.logout();
    output::success("Logged out");
}

pub async fn whoami(ctx: &CommandContext) -> Result<()> {
    ctx.session.initialize().await;
    match ctx.session.current_user() {
        Some(user) => {
            println!("\x1b[32m✓ Logged in as {}\x1b[0m", user.username);
            println!("Email: {}", user.email);
            if !user.faculty.is_empty() {
                println!("Faculty: {}", user.faculty);
            }
            if !user.speciality.is_empty() {
                println!("Speciality: {}", user.speciality);
            }
            println!(
                "Wallet balance: {}",
                output::format_money(user.wallet_balance)
            );
        }
        None => {
            println!("\x1b[33m✗ Not logged in\x1b[0m");
            println!("Run '\x1b[1mclubhub login <username>\x1b[0m' to authenticate");
        }
    }
    Ok(())
}

pub async fn register(
    ctx: &CommandContext,
    username: String,
    email: String,
    password: Option<String>,
    faculty: Option<String>,
    speciality: Option<String>,
) -> Result<()> {
    let (password, password2) = match password {
        Some(password) => (password.clone(), password),
        None => (prompt("Password: ")?, prompt("Confirm password: ")?),
    };

    let form = RegisterStudent {
        username,
        email,
        password,
        password2,
        faculty,
        speciality,
    };
    validate_registration(&form)?;

    let student = ctx.client.students().register(&form).await?;
    output::success(&format!("Account created for {}", student.username));
    output::muted("Check your inbox for the verification email, then log in");
    Ok(())
}

pub async fn verify_email(ctx: &CommandContext, username: &str, token: &str) -> Result<()> {
    ctx.client.students().verify_email(username, token).await?;
    output::success(&format!("Email verified for {username}"));
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
