//! Connect to a device and print `show version`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example show_version -- --host 192.0.2.1 --user admin --password secret
//! ```
//!
//! Without `--port` the example probes 22 and then 23.

use std::env;
use std::time::Duration;

use netprompt::SessionBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let (Some(user), Some(password)) = (args.user, args.password) else {
        eprintln!("Error: --user and --password are required");
        std::process::exit(1);
    };

    println!("Connecting to {}...", args.host);
    let mut builder = SessionBuilder::new(&args.host)
        .username(user)
        .password(password)
        .timeout(Duration::from_secs(10))
        .command_timeout(Duration::from_secs(args.timeout));
    if let Some(port) = args.port {
        builder = builder.port(port);
    }

    let session = builder.connect().await?;
    println!(
        "Connected over {} to port {}, prompt {:?}",
        session.protocol(),
        session.port(),
        session.banner()
    );

    session.enter_command("terminal length 0", "[>#]").await?;

    let response = session.get_data("show version").await?;
    println!("{}", "-".repeat(50));
    println!("{}", response);
    println!("{}", "-".repeat(50));
    println!("Command completed in {:?}", response.elapsed);

    session.close().await?;
    Ok(())
}

struct Args {
    host: String,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let mut parsed = Args {
            host: "localhost".to_string(),
            port: None,
            user: None,
            password: None,
            timeout: 30,
        };

        let mut args = env::args().skip(1);
        while let Some(flag) = args.next() {
            let value = args.next();
            match flag.as_str() {
                "--host" | "-h" => parsed.host = value.unwrap_or(parsed.host),
                "--port" | "-p" => parsed.port = value.and_then(|v| v.parse().ok()),
                "--user" | "-u" => parsed.user = value,
                "--password" | "-P" => parsed.password = value,
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(30)
                }
                other => eprintln!("Ignoring unknown argument {other}"),
            }
        }
        parsed
    }
}
