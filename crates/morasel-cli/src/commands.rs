//! Subcommand handlers.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use morasel_core::auth::validation::{NewCampaignForm, NewChannelForm, NewContactForm};
use morasel_core::models::{
    Campaign, CampaignImage, Channel, ContactQuery, ContactUpdate, Page,
    TransactionQuery,
};
use morasel_core::{App, Config, LoginForm, RegisterForm};

use crate::utils::{format_date, format_optional, format_points, progress_bar, truncate_string};
use crate::{CampaignCommand, ChannelCommand, Command, ContactCommand, PointsCommand};

/// Width of the name column in list output
const NAME_WIDTH: usize = 24;

/// Width of campaign progress bars
const PROGRESS_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Print as JSON when requested, otherwise run `table`.
    fn emit<T: Serialize>(&self, value: &T, table: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            table(value);
        }
        Ok(())
    }
}

pub async fn run(app: &App, config: &mut Config, command: Command, out: Output) -> Result<()> {
    match command {
        Command::Login { email, password } => login(app, config, email, password).await,
        Command::Register { name, email, phone, password } => {
            let password = read_password(password)?;
            let form = RegisterForm { name, email, phone, password };
            let user = app.register(&form).await?;
            println!("Account created. Signed in as {}", user.display_name());
            Ok(())
        }
        Command::Logout => {
            app.logout().await.context("Failed to sign out")?;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            let session = app.current();
            let user = session.user().context("Not logged in")?;
            out.emit(user, |u| {
                println!("{} <{}>", u.display_name(), u.email);
                println!("ID: {}", u.id);
                if let Some(ref phone) = u.phone {
                    println!("Phone: {}", phone);
                }
            })
        }
        Command::Stats => {
            require_session(app)?;
            stats(app, out).await
        }
        Command::Channels { action } => {
            require_session(app)?;
            channels(app, action, out).await
        }
        Command::Contacts { action } => {
            require_session(app)?;
            contacts(app, action, out).await
        }
        Command::Campaigns { action } => {
            require_session(app)?;
            campaigns(app, action, out).await
        }
        Command::Points { action } => {
            require_session(app)?;
            points(app, action, out).await
        }
    }
}

fn require_session(app: &App) -> Result<()> {
    if !app.current().is_authenticated() {
        bail!("Not logged in. Run `morasel login` first.");
    }
    Ok(())
}

// ===== Auth =====

async fn login(
    app: &App,
    config: &mut Config,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => prompt("Email", config.last_email.as_deref())?,
    };
    let password = read_password(password)?;

    let user = app.login(&LoginForm::new(email.trim(), password)).await?;
    println!("Signed in as {}", user.display_name());

    config.last_email = Some(email.trim().to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("Failed to read input")?;
    let line = line.trim();
    Ok(match (line.is_empty(), default) {
        (true, Some(d)) => d.to_string(),
        _ => line.to_string(),
    })
}

fn read_password(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => rpassword::prompt_password("Password: ").context("Failed to read password"),
    }
}

// ===== Dashboard =====

async fn stats(app: &App, out: Output) -> Result<()> {
    let (stats, points, channels) = futures::future::join3(
        app.campaigns.dashboard_stats(),
        app.points.my_points(),
        app.channels.list(),
    )
    .await;
    let stats = stats.context("Failed to load dashboard stats")?;

    if out.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Messages sent:    {}", stats.total_sent);
    println!("Messages failed:  {}", stats.total_failed);
    println!("Delivery rate:    {:.1}%", stats.delivery_rate);
    println!("Campaigns:        {}", stats.campaign_count);

    // The dashboard still renders when the secondary calls fail.
    match points {
        Ok(p) => println!("Points:           {}", format_points(p.points, false)),
        Err(e) => println!("Points:           unavailable ({})", e),
    }
    match channels {
        Ok(list) => {
            let online = list.iter().filter(|c| c.is_online()).count();
            println!("Channels:         {} of {} connected", online, list.len());
        }
        Err(e) => println!("Channels:         unavailable ({})", e),
    }

    if !stats.recent_campaigns.is_empty() {
        println!("\nRecent campaigns:");
        for c in &stats.recent_campaigns {
            println!(
                "  {:<width$} {:<10} {}/{}",
                truncate_string(&c.name, NAME_WIDTH),
                c.status,
                c.sent_count,
                c.total_count,
                width = NAME_WIDTH
            );
        }
    }
    Ok(())
}

// ===== Channels =====

async fn channels(app: &App, action: ChannelCommand, out: Output) -> Result<()> {
    match action {
        ChannelCommand::List => {
            let list = app.channels.list().await.context("Failed to list channels")?;
            out.emit(&list, |list| {
                if list.is_empty() {
                    println!("No channels yet.");
                }
                for c in list {
                    print_channel_row(c);
                }
            })
        }
        ChannelCommand::Create { name, phone, no_wait } => {
            let request = NewChannelForm { name, phone_number: phone }.validate()?;
            let channel = app
                .channels
                .create(&request.name, &request.phone_number)
                .await
                .context("Failed to create channel")?;
            out.emit(&channel, print_channel_detail)?;
            if no_wait || channel.is_online() {
                return Ok(());
            }
            watch(app, &channel.id, crate::DEFAULT_WATCH_TIMEOUT_SECS).await
        }
        ChannelCommand::Show { id } => {
            let channel = app.channels.get(&id).await.context("Failed to load channel")?;
            out.emit(&channel, print_channel_detail)
        }
        ChannelCommand::Delete { id } => {
            app.channels.delete(&id).await.context("Failed to delete channel")?;
            println!("Channel {} deleted.", id);
            Ok(())
        }
        ChannelCommand::Watch { id, timeout_secs } => watch(app, &id, timeout_secs).await,
    }
}

async fn watch(app: &App, id: &str, timeout_secs: u64) -> Result<()> {
    println!("Waiting for channel {} to connect. Scan the QR code in WhatsApp.", id);
    let watch = app.channels.watch_connection(id);
    let mut rx = watch.subscribe();

    let connected = tokio::time::timeout(Duration::from_secs(timeout_secs), async {
        let mut last_status = String::new();
        let mut last_qr: Option<String> = None;
        loop {
            if rx.changed().await.is_err() {
                return rx.borrow().clone().filter(Channel::is_online);
            }
            let Some(channel) = rx.borrow_and_update().clone() else {
                continue;
            };
            if channel.status != last_status {
                println!("Status: {}", channel.status);
                last_status = channel.status.clone();
            }
            let qr = channel.pending_qr().map(str::to_string);
            if qr.is_some() && qr != last_qr {
                println!("QR: {}", qr.as_deref().unwrap_or_default());
                last_qr = qr;
            }
            if channel.is_online() {
                return Some(channel);
            }
        }
    })
    .await;

    match connected {
        Ok(Some(channel)) => {
            info!(id = %channel.id, "Channel connected");
            println!("Connected: {} ({})", channel.name, channel.phone_number);
            Ok(())
        }
        Ok(None) => bail!("Stopped watching channel {}", id),
        Err(_) => bail!("Channel {} did not connect within {}s", id, timeout_secs),
    }
}

fn print_channel_row(c: &Channel) {
    let state = if c.is_online() { "online" } else { "offline" };
    println!(
        "{:<12} {:<width$} {:<16} {}",
        c.id,
        truncate_string(&c.name, NAME_WIDTH),
        c.phone_number,
        state,
        width = NAME_WIDTH
    );
}

fn print_channel_detail(c: &Channel) {
    println!("ID:       {}", c.id);
    println!("Name:     {}", c.name);
    println!("Phone:    {}", c.phone_number);
    println!("Status:   {}", format_optional(Some(c.status.as_str()), "unknown"));
    if let Some(ref last) = c.last_connected {
        println!("Last seen: {}", format_date(last));
    }
    if let Some(qr) = c.pending_qr() {
        println!("QR:       {}", qr);
    }
}

// ===== Contacts =====

async fn contacts(app: &App, action: ContactCommand, out: Output) -> Result<()> {
    match action {
        ContactCommand::List { page, limit, search } => {
            let query = ContactQuery { page, limit, search };
            let page = app.contacts.list(&query).await.context("Failed to list contacts")?;
            out.emit(&page, |page| {
                for c in &page.data {
                    println!(
                        "{:<12} {:<width$} {}",
                        c.id,
                        truncate_string(&c.name, NAME_WIDTH),
                        c.phone,
                        width = NAME_WIDTH
                    );
                }
                print_page_footer(page);
            })
        }
        ContactCommand::Add { name, phone, notes, channels } => {
            let request = NewContactForm {
                name,
                phone_number: phone,
                notes: notes.unwrap_or_default(),
                channel_ids: channels,
            }
            .validate()?;
            let contact = app.contacts.create(&request).await.context("Failed to add contact")?;
            out.emit(&contact, |c| println!("Added contact {} ({})", c.name, c.id))
        }
        ContactCommand::Update { id, name, phone, notes } => {
            let update = ContactUpdate {
                name,
                phone_number: phone,
                notes,
                channel_ids: None,
            };
            if update.is_empty() {
                bail!("Nothing to update. Pass --name, --phone or --notes.");
            }
            let contact = app
                .contacts
                .update(&id, &update)
                .await
                .context("Failed to update contact")?;
            out.emit(&contact, |c| println!("Updated contact {} ({})", c.name, c.id))
        }
        ContactCommand::Delete { id } => {
            app.contacts.delete(&id).await.context("Failed to delete contact")?;
            println!("Contact {} deleted.", id);
            Ok(())
        }
        ContactCommand::Clear { yes } => {
            if !yes {
                bail!("This deletes every contact. Re-run with --yes to confirm.");
            }
            app.contacts.delete_all().await.context("Failed to delete contacts")?;
            println!("All contacts deleted.");
            Ok(())
        }
    }
}

fn print_page_footer<T>(page: &Page<T>) {
    println!(
        "Page {}/{} - {} total",
        page.page,
        page.total_pages.max(1),
        page.total
    );
}

// ===== Campaigns =====

async fn campaigns(app: &App, action: CampaignCommand, out: Output) -> Result<()> {
    match action {
        CampaignCommand::List => {
            let list = app.campaigns.list().await.context("Failed to list campaigns")?;
            out.emit(&list, |list| {
                if list.is_empty() {
                    println!("No campaigns yet.");
                }
                for c in list {
                    println!(
                        "{:<12} {:<width$} {:<10} {}",
                        c.id,
                        truncate_string(&c.name, NAME_WIDTH),
                        c.status().to_string(),
                        progress_bar(c.progress_percent(), PROGRESS_WIDTH),
                        width = NAME_WIDTH
                    );
                }
            })
        }
        CampaignCommand::Show { id } => {
            let campaign = app.campaigns.get(&id).await.context("Failed to load campaign")?;
            out.emit(&campaign, print_campaign_detail)
        }
        CampaignCommand::Create {
            name,
            message,
            channel,
            contacts,
            image,
            image_last,
            no_protection,
            protection,
            delay,
            batch_size,
            batch_delay,
        } => {
            let form = NewCampaignForm {
                name,
                message,
                channel_id: channel,
                contact_ids: contacts,
                protection_enabled: !no_protection,
                protection_type: protection,
                delay_between_messages: delay.unwrap_or_default(),
                batch_size: batch_size.unwrap_or_default(),
                batch_delay: batch_delay.unwrap_or_default(),
                send_image_first: !image_last,
            };
            let request = form.validate()?;

            let campaign = match image {
                Some(path) => {
                    let bytes = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read image {}", path.display()))?;
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "image".to_string());
                    app.campaigns
                        .create_with_image(&request, CampaignImage::from_bytes(file_name, bytes))
                        .await
                }
                None => app.campaigns.create(&request).await,
            }
            .context("Failed to create campaign")?;

            out.emit(&campaign, |c| println!("Created campaign {} ({})", c.name, c.id))
        }
        CampaignCommand::Delete { id } => {
            app.campaigns.delete(&id).await.context("Failed to delete campaign")?;
            println!("Campaign {} deleted.", id);
            Ok(())
        }
    }
}

fn print_campaign_detail(c: &Campaign) {
    println!("ID:        {}", c.id);
    println!("Name:      {}", c.name);
    println!("Status:    {}", c.status());
    if let Some(ref channel) = c.channel {
        println!("Channel:   {} ({})", channel.name, channel.phone_number);
    }
    println!("Progress:  {}", progress_bar(c.progress_percent(), PROGRESS_WIDTH));
    println!("Sent:      {} / {} ({} failed)", c.sent_count, c.total_count, c.failed_count);
    if let Some(ref created) = c.created_at {
        println!("Created:   {}", format_date(created));
    }
    println!("\n{}", c.message);
}

// ===== Points =====

async fn points(app: &App, action: PointsCommand, out: Output) -> Result<()> {
    match action {
        PointsCommand::Balance => {
            let balance = app.points.my_points().await.context("Failed to load points")?;
            out.emit(&balance, |b| println!("{} points", format_points(b.points, false)))
        }
        PointsCommand::Stats => {
            let stats = app.points.my_stats().await.context("Failed to load points stats")?;
            out.emit(&stats, |s| {
                println!("Current:   {}", format_points(s.current_points, false));
                println!("Received:  {}", format_points(s.total_received, false));
                println!("Spent:     {}", format_points(s.total_spent, false));
                println!("Movements: {}", s.transaction_count);
            })
        }
        PointsCommand::Transactions { page, limit, kind } => {
            let query = TransactionQuery { page, limit, kind };
            let page = app
                .points
                .transactions(&query)
                .await
                .context("Failed to load transactions")?;
            out.emit(&page, |page| {
                for t in &page.data {
                    let amount = if t.kind.is_credit() { t.amount.abs() } else { -t.amount.abs() };
                    println!(
                        "{:<20} {:<16} {:>10} {:>10}  {}",
                        t.created_at.as_deref().map(format_date).unwrap_or_default(),
                        t.kind.as_str(),
                        format_points(amount, true),
                        format_points(t.balance_after, false),
                        format_optional(t.description.as_deref(), "")
                    );
                }
                print_page_footer(page);
            })
        }
    }
}
