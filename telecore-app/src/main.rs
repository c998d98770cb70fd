//! telecore-app: interactive login + update feed.
//!
//! Runs against the in-memory backend by default (the code is `12345`):
//!   cargo run -p telecore-app
//!
//! Point it at a real backend instead:
//!   TELECORE_ADDR=127.0.0.1:4430 cargo run -p telecore-app
//!   TELECORE_SOCKS5=user:pass@127.0.0.1:1080 TELECORE_ADDR=… cargo run -p telecore-app

use std::io::{self, BufRead, Write};

use telecore_client::{
    delegate_fn, AuthError, AuthorizationState, ChatUpdate, Client, CodeType, Config, FakeConfig,
    MessageUpdate, Socks5Config, TcpConfig, UserUpdate,
};
use telecore_tl::enums::UserStatus;

#[tokio::main]
async fn main() {
    // Enable logging: RUST_LOG=telecore_client=debug cargo run -p telecore-app
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: single-threaded at this point, no other threads reading env
        unsafe { std::env::set_var("RUST_LOG", "telecore_client=info,telecore_app=info"); }
    }
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("\n✗ {e}");
        std::process::exit(1);
    }
}

fn config_from_env() -> Config {
    match std::env::var("TELECORE_ADDR") {
        Ok(addr) => {
            let mut tcp = TcpConfig::new(addr);
            tcp.socks5 = std::env::var("TELECORE_SOCKS5").ok().map(|s| Socks5Config::parse(&s));
            Config::tcp(tcp)
        }
        Err(_) => {
            println!("ℹ️  TELECORE_ADDR not set, using the in-memory backend (code: 12345)");
            Config::fake(FakeConfig::default())
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::connect(config_from_env()).await?;
    install_delegates(&client);

    login(&client).await?;

    let me = client.get_me().await?;
    println!("✅ Signed in as {} {} (id={})", me.first_name, me.last_name, me.id);

    println!("\n👂 Listening for updates (Ctrl+C to quit) …\n");
    tokio::signal::ctrl_c().await?;

    if std::env::var_os("TELECORE_LOGOUT").is_some() {
        client.auth().logout().await?;
        println!("👋 Logged out");
    }
    client.shutdown().await;
    Ok(())
}

// ── Login ─────────────────────────────────────────────────────────────────────

/// Prompt for whatever the current state asks for until authorized.
async fn login(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
    let auth = client.auth();
    let mut states = auth.subscribe();

    loop {
        let state = states.borrow_and_update().clone();
        let result = match state {
            AuthorizationState::Authorized => return Ok(()),
            AuthorizationState::Loading => {
                states.changed().await?;
                continue;
            }
            AuthorizationState::WaitingForPhoneNumber => {
                let phone = prompt("📱 Phone number (international, e.g. +15551234567): ")?;
                auth.send_phone_number(&phone).await
            }
            AuthorizationState::WaitingForCode(info) => {
                let via = describe(info.code_type());
                let code = prompt(&format!("🔑 Code sent {via} to {} (or 'resend'): ", info.phone_number()))?;
                if code.eq_ignore_ascii_case("resend") {
                    auth.resend_code().await
                } else {
                    auth.verify_code(&code).await
                }
            }
            AuthorizationState::WaitingForPassword { hint, .. } => {
                let hint = if hint.is_empty() { "(no hint)".to_string() } else { hint };
                let pw = prompt(&format!("🔒 2FA password (hint: {hint}): "))?;
                auth.verify_password(&pw).await
            }
            AuthorizationState::WaitingForRegistration => {
                let first = prompt("📝 First name: ")?;
                let last = prompt("📝 Last name (optional): ")?;
                auth.register_user(&first, Some(&last)).await
            }
        };

        match result {
            Ok(()) => {}
            Err(AuthError::Network(e)) => return Err(e.to_string().into()),
            Err(e) => eprintln!("✗ {e}, try again"),
        }
    }
}

fn describe(code_type: &CodeType) -> String {
    match code_type {
        CodeType::Sms { .. }                              => "by SMS".into(),
        CodeType::Call { .. }                             => "by phone call".into(),
        CodeType::FlashCall { .. }                        => "by flash call".into(),
        CodeType::MissedCall { phone_number_prefix, .. }  => format!("as a missed call from {phone_number_prefix}…"),
        CodeType::Fragment { url, .. }                    => format!("on Fragment ({url})"),
    }
}

// ── Update feed ───────────────────────────────────────────────────────────────

fn install_delegates(client: &Client) {
    let dispatcher = client.dispatcher();

    dispatcher.set_message_delegate(Some(delegate_fn(|update: MessageUpdate| async move {
        match update {
            MessageUpdate::New(msg) if !msg.outgoing() => {
                let at = msg.date().map(|d| d.format("%H:%M:%S").to_string()).unwrap_or_default();
                println!("📨 [{at}] chat {} #{}: {}", msg.chat_id(), msg.id(), msg.text().unwrap_or(""));
            }
            MessageUpdate::New(_) => {}
            MessageUpdate::Edited(edit) => {
                println!("✏️  Message edited [chat={} id={}]: {}", edit.chat_id, edit.message_id, edit.text);
            }
            MessageUpdate::Deleted(del) => {
                println!("🗑️  Messages deleted in chat {}: {:?}", del.chat_id, del.message_ids);
            }
        }
    })));

    dispatcher.set_chat_delegate(Some(delegate_fn(|update: ChatUpdate| async move {
        match update {
            ChatUpdate::New(chat) => println!("💬 New chat [{}]: {}", chat.id, chat.title),
            ChatUpdate::TitleChanged { chat_id, title } => println!("💬 Chat {chat_id} renamed to {title}"),
            ChatUpdate::UnreadCountChanged { chat_id, unread_count, .. } => {
                println!("💬 Chat {chat_id}: {unread_count} unread");
            }
            ChatUpdate::LastMessageChanged { .. } => {}
        }
    })));

    dispatcher.set_user_delegate(Some(delegate_fn(|update: UserUpdate| async move {
        match update {
            UserUpdate::Changed(user) => println!("👤 User {}: {} {}", user.id, user.first_name, user.last_name),
            UserUpdate::Status { user_id, status } => {
                let status = match status {
                    UserStatus::Online(_)   => "online",
                    UserStatus::Offline(_)  => "offline",
                    UserStatus::Recently(_) => "seen recently",
                    UserStatus::Empty(_)    => "unknown",
                };
                println!("👤 User {user_id} is {status}");
            }
        }
    })));
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
