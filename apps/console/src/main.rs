use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ClientEvent, DeviceClient};
use shared::domain::ActuatorState;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use url::Url;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Interactive console for the light-and-arm bench device")]
struct Args {
    /// Base URL of the device backend, e.g. http://localhost:5000
    #[arg(long)]
    device_url: Option<String>,
    /// Refresh interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Subscribe to the push channel alongside polling
    #[arg(long)]
    push: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(device_url) = args.device_url {
        settings.device_url = device_url;
    }
    if let Some(ms) = args.poll_interval_ms {
        settings.poll_interval_ms = ms;
    }
    if args.push {
        settings.push_enabled = true;
    }
    Url::parse(&settings.device_url).context("invalid device url")?;

    let client = DeviceClient::new(settings.device_url.clone());
    let poller = client.spawn_poller(Duration::from_millis(settings.poll_interval_ms));
    let push = settings.push_enabled.then(|| client.spawn_push_channel());

    let mut events = client.subscribe_events();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ClientEvent::StateChanged(state)) => print_state(state),
                Ok(ClientEvent::ConnectionChanged(status)) => println!("link: {}", status.label),
                Ok(ClientEvent::InterpreterReply(text)) => println!("device: {text}"),
                Ok(ClientEvent::UserError(text)) => println!("! {text}"),
                Ok(ClientEvent::ListeningChanged(true)) => println!("listening..."),
                Ok(ClientEvent::ListeningChanged(false)) => println!("listening stopped"),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        if let Err(err) = handle_command(&client, line).await {
            println!("! {err}");
        }
    }

    poller.abort();
    if let Some(task) = push {
        task.abort();
    }
    printer.abort();
    Ok(())
}

async fn handle_command(client: &Arc<DeviceClient>, line: &str) -> Result<()> {
    let (verb, rest) = match line.split_once(' ') {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    match verb {
        "help" => print_help(),
        "state" => print_state(client.read_state().await),
        "status" => {
            let status = client.connection_status().await;
            println!("link: {} (since {})", status.label, status.since.to_rfc3339());
        }
        "led" => {
            client
                .set_led(rest.parse().context("usage: led <0-100>")?)
                .await?
        }
        "servo" => {
            client
                .set_servo(rest.parse().context("usage: servo <0-180>")?)
                .await?
        }
        "on" => client.set_led(100).await?,
        "off" => client.set_led(0).await?,
        "dim" => client.set_led(30).await?,
        "half" => client.set_led(50).await?,
        "left" => client.set_servo(45).await?,
        "right" => client.set_servo(135).await?,
        "center" => client.set_servo(90).await?,
        "say" => client.send_voice_command(rest).await?,
        "listen" => {
            if !client.start_listening() {
                println!("already listening");
            }
        }
        "stop" => client.stop_listening().await,
        other => println!("unknown command '{other}', try 'help'"),
    }
    Ok(())
}

fn print_state(state: ActuatorState) {
    println!(
        "state: led {}% | arm {} deg",
        state.led_brightness, state.servo_angle
    );
}

fn print_help() {
    println!("commands:");
    println!("  led <0-100> | on | off | dim | half");
    println!("  servo <0-180> | left | right | center");
    println!("  say <free text>       e.g. say turn on the light");
    println!("  listen | stop         voice capture (when available)");
    println!("  state | status | help | quit");
    println!("example spoken commands:");
    println!("  turn on the light / set brightness to 75 / dim the light");
    println!("  move servo left / rotate servo to 45 degrees / servo center");
}
