//! Shanty CLI

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use bytes::Bytes;

use shanty::fixture::FixtureRecord;
use shanty::fingerprint::FIXTURE_EXTENSION;
use shanty::network::HttpClient;
use shanty::serializer::RequestSerializer;
use shanty::{logging, Config, Request, Store};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "path" => cmd_path(&args[2..]),
        "show" => cmd_show(&args[2..]),
        "stats" => cmd_stats(&args[2..]),
        "fetch" => cmd_fetch(&args[2..]),
        command => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'shanty' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn usage() {
    eprintln!("Shanty v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("Usage: shanty <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  path  <METHOD> <URL> [BODY]            Print the fixture path for a request");
    eprintln!("  show  <FIXTURE>                        Print a stored fixture");
    eprintln!("  stats <STORAGE-DIR>                    Count fixtures per host");
    eprintln!("  fetch <CONFIG> <METHOD> <URL> [BODY]   Replay or record a request");
}

fn parse_request(args: &[String]) -> anyhow::Result<Request> {
    let [method, url, rest @ ..] = args else {
        bail!("expected <METHOD> <URL> [BODY]");
    };
    let body = rest.first().map(|b| Bytes::from(b.clone()));
    Request::new(method.as_str(), url, vec![], body).context("invalid request")
}

fn cmd_path(args: &[String]) -> anyhow::Result<()> {
    let request = parse_request(args)?;
    let path = RequestSerializer::default().relative_path(&request);
    println!("{}", path.display());
    Ok(())
}

fn cmd_show(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = args.first() else {
        bail!("expected <FIXTURE>");
    };
    let record = FixtureRecord::read(Path::new(path))?;

    println!("Stored at: {}", record.stored_at);
    println!("Request:   {} {}", record.request.method, record.request.url);
    for (name, value) in &record.request.headers {
        println!("  {name}: {value}");
    }
    println!(
        "Response:  {} {}",
        record.response.status.code, record.response.status.message
    );
    for (name, value) in &record.response.headers {
        println!("  {name}: {value}");
    }

    let response = record.into_response()?;
    match response.body() {
        None => println!("(no body)"),
        Some(body) => println!("{}", String::from_utf8_lossy(body)),
    }
    Ok(())
}

fn cmd_stats(args: &[String]) -> anyhow::Result<()> {
    let Some(dir) = args.first().map(PathBuf::from) else {
        bail!("expected <STORAGE-DIR>");
    };
    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }

    let mut per_host: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for host_dir in fs::read_dir(&dir)? {
        let host_dir = host_dir?.path();
        if !host_dir.is_dir() {
            continue;
        }
        let host = host_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut fixtures = Vec::new();
        collect_fixtures(&host_dir, &mut fixtures)?;
        let invalid = fixtures
            .iter()
            .filter(|path| FixtureRecord::read(path).is_err())
            .count();
        per_host.insert(host, (fixtures.len(), invalid));
    }

    println!("Storage directory: {}", dir.display());
    println!();
    let mut total = 0;
    for (host, (count, invalid)) in &per_host {
        total += count;
        if *invalid > 0 {
            println!("  {host}: {count} fixtures ({invalid} unreadable)");
        } else {
            println!("  {host}: {count} fixtures");
        }
    }
    println!();
    println!("Total: {total} fixtures across {} hosts", per_host.len());
    Ok(())
}

fn collect_fixtures(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_fixtures(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == FIXTURE_EXTENSION) {
            out.push(path);
        }
    }
    Ok(())
}

fn cmd_fetch(args: &[String]) -> anyhow::Result<()> {
    let [config_path, rest @ ..] = args else {
        bail!("expected <CONFIG> <METHOD> <URL> [BODY]");
    };
    let config = Config::from_file(Path::new(config_path))?;
    logging::init(&config.log)?;

    let request = parse_request(rest)?;
    let store = Store::new(config.to_policy()?);
    let client = HttpClient::new();

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    let response =
        runtime.block_on(store.fetch_async(&request, || client.execute(&request)))?;

    let source = if response.was_replayed() {
        "replayed"
    } else {
        "live"
    };
    println!("{} {} ({source})", response.status(), response.message());
    if let Some(body) = response.body() {
        println!("{}", String::from_utf8_lossy(body));
    }
    Ok(())
}
