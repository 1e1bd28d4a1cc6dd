//!
//! mmms_shell
//! ----------
//! Interactive console over the access layer: sign in, navigate, and inspect what
//! the guard renders and which menu entries are offered.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use mmms_access::config::AccessConfig;
use mmms_access::identity::{Credentials, LoginOutcome, Profile};
use mmms_access::navigation::NavigationEntry;
use mmms_access::notify::{NoticeLevel, RecordingSink};
use mmms_access::shell::{AccessShell, Navigation};
use mmms_access::RenderDecision;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--config <file>] [--store <path>]\n\nFlags:\n  --config <file>   JSON settings (MMMS_* environment variables override)\n  --store <path>    session file; omit to keep the session in memory\n  -h, --help        show this help\n\nInteractive commands:\n  login <identifier> <secret>\n  register <name> <email> <secret>\n  logout\n  whoami\n  go <path>          resolve a path through the guard, following redirects\n  menu               show the sidebar for the current role\n  search <text>      command palette search\n  help\n  quit | exit"
    );
}

fn print_menu(entries: &[NavigationEntry], depth: usize) {
    for e in entries {
        println!("{}{}  ({})", "  ".repeat(depth), e.label, e.path);
        print_menu(&e.children, depth + 1);
    }
}

fn flush_notices(sink: &RecordingSink) {
    for n in sink.drain() {
        match n.level {
            NoticeLevel::Success => println!("[ok] {}", n.message),
            NoticeLevel::Error => println!("[error] {}", n.message),
        }
    }
}

fn describe(nav: &Navigation) -> String {
    match nav {
        Navigation::Public { view } => format!("render {}", view),
        Navigation::Guarded { decision: RenderDecision::RenderPrimary(v), .. } => format!("render {}", v),
        Navigation::Guarded { decision: RenderDecision::RenderAlternate(v), .. } => format!("render {} (alternate)", v),
        Navigation::Guarded { decision: RenderDecision::Defer, .. } => "loading...".to_string(),
        Navigation::Guarded { decision: RenderDecision::Redirect(to), .. } | Navigation::Redirect { to } => format!("redirect {}", to),
        Navigation::NotFound => "render NotFound".to_string(),
    }
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut config_path: Option<PathBuf> = None;
    let mut store_path: Option<PathBuf> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 >= args.len() { eprintln!("--config requires a value"); print_usage(&program); std::process::exit(2); }
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            "--store" => {
                if i + 1 >= args.len() { eprintln!("--store requires a value"); print_usage(&program); std::process::exit(2); }
                store_path = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            other => { eprintln!("unknown argument: {}", other); print_usage(&program); std::process::exit(2); }
        }
    }

    let mut cfg = match &config_path {
        Some(p) => AccessConfig::load(p)?,
        None => AccessConfig::from_env()?,
    };
    if store_path.is_some() { cfg.store_path = store_path; }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_filter))
        .map_err(|e| anyhow!("invalid log filter: {}", e))?;
    fmt().with_env_filter(filter).init();
    info!(target: "mmms", "mmms_shell starting: store={:?}, landing='{}', login='{}'", cfg.store_path, cfg.landing_path, cfg.login_path);

    let rt = tokio::runtime::Runtime::new()?;
    let sink = RecordingSink::new();
    let shell = AccessShell::from_config(&cfg, Arc::new(sink.clone()))?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    println!("mmms_shell. Type 'help' for commands.");
    loop {
        input.clear();
        print!("> "); let _ = stdout.flush();
        match stdin.read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some(cmd) = parts.first() else { continue; };
        match cmd.to_lowercase().as_str() {
            "quit" | "exit" => break,
            "help" => print_usage(&program),
            "login" => {
                if parts.len() < 3 { eprintln!("usage: login <identifier> <secret>"); continue; }
                match rt.block_on(shell.store().login(Credentials::new(parts[1], parts[2]))) {
                    Ok(LoginOutcome::Authenticated(ident)) => println!("signed in as {} ({})", ident.display_name, ident.role),
                    Ok(LoginOutcome::Superseded) => println!("login superseded"),
                    Err(e) => eprintln!("{}", e.notice_text()),
                }
            }
            "register" => {
                if parts.len() < 4 { eprintln!("usage: register <name> <email> <secret>"); continue; }
                if let Err(e) = rt.block_on(shell.store().register(Profile::new(parts[1], parts[2], parts[3]))) {
                    eprintln!("{}", e.notice_text());
                }
            }
            "logout" => shell.store().logout(),
            "whoami" => match shell.session().identity {
                Some(ident) => println!("{} <{}> role={}", ident.display_name, ident.email, ident.role),
                None => println!("not signed in"),
            },
            "go" => {
                let path = parts.get(1).copied().unwrap_or("/");
                match shell.settle(path) {
                    Ok(s) if s.hops > 0 => println!("{} -> {}: {}", path, s.path, describe(&s.navigation)),
                    Ok(s) => println!("{}: {}", s.path, describe(&s.navigation)),
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            "menu" => {
                let menu = shell.menu();
                if menu.is_empty() { println!("(no entries)"); } else { print_menu(&menu, 0); }
            }
            "search" => {
                let query = parts[1..].join(" ");
                for g in shell.palette_search(&query) {
                    println!("{}:", g.heading);
                    for item in g.items { println!("  {}  ({})", item.label, item.path); }
                }
            }
            other => eprintln!("unknown command '{}'; type 'help'", other),
        }
        flush_notices(&sink);
    }
    Ok(())
}
