use std::{env, env::VarError};

// The database URL may carry credentials, so it is left out
const DISPLAY_ENVS: [&str; 12] = [
    "RUST_LOG",
    "LPS_HOST",
    "LPS_PORT",
    "LPS_DATABASE_MAX_CONNECTIONS",
    "LPS_RUN_MIGRATIONS",
    "LPS_ACCRUAL_SYSTEM_ADDRESS",
    "LPS_ACCRUAL_TIMEOUT",
    "LPS_ACCRUAL_PAUSE",
    "LPS_QUEUE_SIZE",
    "LPS_WORKER_COUNT",
    "LPS_RECONCILE_INTERVAL",
    "LPS_STALE_ORDER_AGE",
];

/// The server is configured entirely through the environment. Any command-line argument prints the help text and the
/// current configuration instead of starting the server. Returns `true` in that case.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        println!("\n{}\n", include_str!("./cli-help.txt"));
        print_environment();
    }
    has_cli_args
}

fn print_environment() {
    println!("Current environment values (EXCLUDING variables that contain secrets):");
    for name in DISPLAY_ENVS {
        println!("  {name:<35} {:<15}", describe_value(env::var(name)));
    }
}

fn describe_value(value: Result<String, VarError>) -> String {
    match value {
        Ok(s) => s,
        Err(VarError::NotPresent) => "Not set".into(),
        Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
    }
}
