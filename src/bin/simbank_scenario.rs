//! Scripted SimBank walkthrough
//!
//! Logs on to a SimBank system, opens the BANK application, queries
//! two seeded accounts, transfers money between them, and verifies the
//! balance moved. Useful as a smoke test against a running SimBank:
//!
//!     simbank_scenario --server 127.0.0.1 --port 2023
//!
//! Set RUST_LOG=debug to watch the protocol exchange.

use anyhow::{bail, ensure, Context, Result};
use log::info;

use tn3270r::Client;

const ACCOUNT_1: &str = "123456789";
const ACCOUNT_2: &str = "987654321";
const WAIT_SECS: u64 = 30;

fn main() -> Result<()> {
    env_logger::init();

    let mut server = "127.0.0.1".to_string();
    let mut port: u16 = 2023;

    let args: Vec<String> = std::env::args().collect();
    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "--server" | "-s" => {
                index += 1;
                server = args
                    .get(index)
                    .cloned()
                    .context("--server requires a value")?;
            }
            "--port" | "-p" => {
                index += 1;
                port = args
                    .get(index)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port requires a numeric value")?;
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => {
                print_usage();
                bail!("unrecognized option: {other}");
            }
        }
        index += 1;
    }

    let mut client = Client::new();
    client
        .connect(&server, port)
        .with_context(|| format!("failed to connect to {server}:{port}"))?;
    info!("connected to {server}:{port}");

    let outcome = run_scenario(&mut client);
    client.disconnect();
    outcome
}

fn print_usage() {
    println!("Usage: simbank_scenario [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --server <host> or -s <host>    SimBank host (default: 127.0.0.1)");
    println!("  --port <port> or -p <port>      SimBank telnet port (default: 2023)");
    println!("  --help or -h                    Show this help");
}

fn run_scenario(client: &mut Client) -> Result<()> {
    client.wait_for_field(WAIT_SECS)?;
    expect(client, "SIMPLATFORM")?;
    expect(client, "Userid")?;

    info!("logging on");
    client.type_text("IBMUSER")?;
    client.tab()?;
    client.type_text("SYS1")?;
    client.enter()?;
    client.wait_for_field(WAIT_SECS)?;
    expect(client, "SIMPLATFORM MAIN MENU")?;

    // The BANK application lives behind the session manager: option 1,
    // then a cleared screen takes the transaction name.
    info!("starting the BANK transaction");
    client.pf(1)?;
    client.wait_for_field(WAIT_SECS)?;
    client.clear()?;
    client.wait_for_field(WAIT_SECS)?;
    client.type_text("BANK")?;
    client.enter()?;
    client.wait_for_text("SIMBANK MAIN MENU", WAIT_SECS)?;
    println!("{}", client.print_screen()?);

    info!("querying account {ACCOUNT_1}");
    client.pf(1)?;
    client.wait_for_text("SIMBANK ACCOUNT MENU", WAIT_SECS)?;
    client.type_text(ACCOUNT_1)?;
    client.enter()?;
    client.wait_for_text("Account Found", WAIT_SECS)?;
    println!("{}", client.print_screen()?);
    let balance_before = read_balance(&client.screen_text()?)?;
    info!("balance before transfer: {balance_before:.2}");

    client.pf(3)?;
    client.wait_for_text("SIMBANK MAIN MENU", WAIT_SECS)?;

    info!("transferring 10.00 from {ACCOUNT_2} to {ACCOUNT_1}");
    client.pf(4)?;
    client.wait_for_text("SIMBANK TRANSFER MENU", WAIT_SECS)?;
    client.type_text(ACCOUNT_2)?;
    client.tab()?;
    client.type_text(ACCOUNT_1)?;
    client.tab()?;
    client.type_text("10.00")?;
    client.enter()?;
    client.wait_for_text("Transfer Successful", WAIT_SECS)?;

    client.pf(3)?;
    client.wait_for_text("SIMBANK MAIN MENU", WAIT_SECS)?;
    client.pf(1)?;
    client.wait_for_text("SIMBANK ACCOUNT MENU", WAIT_SECS)?;
    client.type_text(ACCOUNT_1)?;
    client.enter()?;
    client.wait_for_text("Account Found", WAIT_SECS)?;
    let balance_after = read_balance(&client.screen_text()?)?;
    info!("balance after transfer: {balance_after:.2}");
    ensure!(
        balance_after > balance_before,
        "balance did not increase: {balance_before:.2} -> {balance_after:.2}"
    );

    println!("Transfer verified: {balance_before:.2} -> {balance_after:.2}");
    Ok(())
}

fn expect(client: &Client, needle: &str) -> Result<()> {
    let screen = client.screen_text()?;
    ensure!(
        screen.contains(needle),
        "expected {needle:?} on screen:\n{screen}"
    );
    Ok(())
}

/// Pull the decimal balance out of the account detail screen
fn read_balance(screen: &str) -> Result<f64> {
    let after = screen
        .split("Balance")
        .nth(1)
        .context("no Balance line on the account screen")?;
    let number: String = after
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number
        .parse()
        .with_context(|| format!("unparseable balance in {number:?}"))
}
