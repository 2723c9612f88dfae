use std::error::Error;
use std::io::Write;

use sarge::prelude::*;
use serde_json::Value;
use tabstream::cli::{SkipRowList, StreamArgs, exit_code, render_line};
use tabstream::{RowShape, TabularError};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tabstream --source <path|url> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --source <value>     Path, URL or text:// literal");
    eprintln!("      --scheme <name>      Override the detected scheme");
    eprintln!("  -f, --format <name>      Override the detected format");
    eprintln!("  -e, --encoding <label>   Override the detected encoding");
    eprintln!("      --headers <row>      Take headers from this 1-based row");
    eprintln!("      --sample-size <n>    Rows sampled at open (default 100)");
    eprintln!("  -n, --limit <n>          Stop after n rows");
    eprintln!("      --skip-rows <list>   Row numbers, prefixes or `blank`");
    eprintln!("      --force-parse        Emit malformed rows as empty rows");
    eprintln!("  -c, --config <file>      JSON, YAML or TOML stream config");
}

fn parse_args() -> Result<StreamArgs, Box<dyn Error>> {
    let mut reader = ArgumentReader::new();

    let source = reader.add::<String>(tag::both('s', "source"));
    let scheme = reader.add::<String>(tag::long("scheme"));
    let format = reader.add::<String>(tag::both('f', "format"));
    let encoding = reader.add::<String>(tag::both('e', "encoding"));
    let headers = reader.add::<usize>(tag::long("headers"));
    let sample_size = reader.add::<usize>(tag::long("sample-size"));
    let limit = reader.add::<usize>(tag::both('n', "limit"));
    let skip_rows = reader.add::<SkipRowList>(tag::long("skip-rows"));
    let force_parse = reader.add::<bool>(tag::long("force-parse"));
    let config = reader.add::<String>(tag::both('c', "config"));

    let args = reader.parse()?;

    Ok(StreamArgs {
        source: source.get(&args).transpose()?,
        scheme: scheme.get(&args).transpose()?,
        format: format.get(&args).transpose()?,
        encoding: encoding.get(&args).transpose()?,
        headers: headers.get(&args).transpose()?,
        sample_size: sample_size.get(&args).transpose()?,
        limit: limit.get(&args).transpose()?,
        skip_rows: match skip_rows.get(&args) {
            Some(Ok(list)) => list,
            Some(Err(never)) => match never {},
            None => SkipRowList::default(),
        },
        force_parse: force_parse.get(&args).transpose()?.unwrap_or(false),
        config: config.get(&args).transpose()?,
    })
}

fn run(args: StreamArgs) -> Result<(), TabularError> {
    let limit = args.limit;
    let mut stream = args.into_builder()?.open()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let io_err = |e: std::io::Error| TabularError::io("-", e);

    if let Some(headers) = stream.headers() {
        let headers: Vec<Value> = headers.iter().cloned().map(Value::String).collect();
        writeln!(out, "{}", render_line(&headers)?).map_err(io_err)?;
    }
    let rows = stream.iter(RowShape::Plain)?;
    for row in rows.take(limit.unwrap_or(usize::MAX)) {
        let values = row?.into_values();
        writeln!(out, "{}", render_line(&values)?).map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    stream.close();
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) if args.source.is_some() || args.config.is_some() => args,
        Ok(_) => {
            eprintln!("tabstream error: missing --source");
            print_usage();
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("tabstream error: {e}");
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("tabstream: {e}");
        let code = exit_code(&e);
        if code == 2 {
            print_usage();
        }
        std::process::exit(code);
    }
}
