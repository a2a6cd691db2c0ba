//! Command-line front end for the PUF key pipeline.
//!
//! `run` executes the whole chain; the other commands expose single stages so
//! outputs can be piped between invocations or checked by external tools.

use std::env;
use std::path::PathBuf;
use std::process;

use puf_sign::{
    derive_private_key, fixed_challenge, respond, sign, verify, write_report, ArbiterPuf, Curve,
    NonceMode, OsEntropy, Pipeline, PipelineConfig, PublicKey, ResponseBytes, Signature,
};
use tracing_subscriber::EnvFilter;

fn fatal(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn print_help() {
    println!("Usage: pufsign <run|respond|derive|sign|verify> ...");
    println!("  run [--message M] [--stages N] [--puf-seed S] [--challenge-seed C]");
    println!("      [--curve p256|secp256k1] [--deterministic] [--config FILE]");
    println!("      [--output FILE] [--json]");
    println!("  respond [--stages N] [--puf-seed S] [--challenge-seed C]");
    println!("  derive <response_hex> [--curve p256|secp256k1]");
    println!("  sign <response_hex> <message> [--curve ...] [--deterministic]");
    println!("  verify <public_key_hex> <message> <signature_hex> [--curve ...]");
    println!();
    println!("Environment: PUFSIGN_STAGES, PUFSIGN_PUF_SEED, PUFSIGN_CHALLENGE_SEED,");
    println!("  PUFSIGN_CURVE, PUFSIGN_NONCE, PUFSIGN_MESSAGE, PUFSIGN_LOG");
}

fn init_logging() {
    let filter = env::var("PUFSIGN_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "pufsign=info,puf_sign=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

/// Flags shared by the subcommands, parsed out of the argument list.
#[derive(Debug, Default)]
struct Flags {
    positional: Vec<String>,
    message: Option<String>,
    stages: Option<usize>,
    puf_seed: Option<u64>,
    challenge_seed: Option<u64>,
    curve: Option<Curve>,
    deterministic: bool,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    json: bool,
}

fn parse_flags(args: Vec<String>) -> Result<Flags, String> {
    let mut flags = Flags::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .ok_or_else(|| format!("missing value for {name}"))
        };
        match arg.as_str() {
            "--message" => flags.message = Some(value("--message")?),
            "--stages" => flags.stages = Some(parse_number("--stages", &value("--stages")?)?),
            "--puf-seed" => {
                flags.puf_seed = Some(parse_number("--puf-seed", &value("--puf-seed")?)?)
            }
            "--challenge-seed" => {
                flags.challenge_seed =
                    Some(parse_number("--challenge-seed", &value("--challenge-seed")?)?)
            }
            "--curve" => flags.curve = Some(value("--curve")?.parse()?),
            "--config" => flags.config = Some(PathBuf::from(value("--config")?)),
            "--output" => flags.output = Some(PathBuf::from(value("--output")?)),
            "--deterministic" => flags.deterministic = true,
            "--json" => flags.json = true,
            other if other.starts_with("--") => return Err(format!("unknown flag: {other}")),
            _ => flags.positional.push(arg.clone()),
        }
    }
    Ok(flags)
}

fn parse_number<T>(name: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|err| format!("invalid value for {name}: {value} ({err})"))
}

fn build_config(flags: &Flags) -> Result<PipelineConfig, String> {
    let mut cfg = match &flags.config {
        Some(path) => PipelineConfig::from_json_file(path).map_err(|err| err.to_string())?,
        None => PipelineConfig::default(),
    };
    cfg.apply_env().map_err(|err| err.to_string())?;
    if let Some(stages) = flags.stages {
        cfg.stage_count = stages;
    }
    if let Some(seed) = flags.puf_seed {
        cfg.puf_seed = seed;
    }
    if let Some(seed) = flags.challenge_seed {
        cfg.challenge_seed = seed;
    }
    if let Some(curve) = flags.curve {
        cfg.curve = curve;
    }
    if flags.deterministic {
        cfg.nonce = NonceMode::Deterministic;
    }
    if let Some(message) = &flags.message {
        cfg.message = message.clone();
    }
    cfg.validate().map_err(|err| err.to_string())?;
    Ok(cfg)
}

fn cmd_run(flags: Flags) -> Result<(), String> {
    let cfg = build_config(&flags)?;
    let message = cfg.message.clone();
    let pipeline = Pipeline::new(cfg).map_err(|err| err.to_string())?;
    let report = pipeline
        .run(&message, &mut OsEntropy)
        .map_err(|err| err.to_string())?;
    if let Some(path) = &flags.output {
        write_report(path, &report)
            .map_err(|err| format!("failed to write {}: {err}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }
    if flags.json {
        let encoded = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
        println!("{encoded}");
    } else {
        println!(
            "Response Bytes: [{}, {}]",
            report.fixed_response, report.random_response
        );
        println!("Response Distance: {} bits", report.response_distance);
        println!("ECC Curve: {}", report.curve);
        println!("ECC Private Key: {}", report.private_key);
        println!("ECC Public Key: {}", report.public_key);
        println!("Ledger Address: {}", report.ledger_address);
        println!("Message Signature: {}", report.signature);
        println!("Verified: {}", report.verified);
    }
    Ok(())
}

fn cmd_respond(flags: Flags) -> Result<(), String> {
    let cfg = build_config(&flags)?;
    let puf = ArbiterPuf::new(cfg.stage_count, cfg.puf_seed).map_err(|err| err.to_string())?;
    let challenge = fixed_challenge(cfg.stage_count, cfg.challenge_seed);
    let response = respond(&puf, &challenge).map_err(|err| err.to_string())?;
    println!("{}", response.to_hex());
    Ok(())
}

fn response_arg(flags: &Flags, index: usize) -> Result<ResponseBytes, String> {
    let raw = flags
        .positional
        .get(index)
        .ok_or_else(|| "missing <response_hex>".to_string())?;
    ResponseBytes::from_hex(raw).map_err(|err| format!("invalid response hex: {err}"))
}

fn cmd_derive(flags: Flags) -> Result<(), String> {
    let response = response_arg(&flags, 0)?;
    let curve = flags.curve.unwrap_or_default();
    let key = derive_private_key(&response, curve).map_err(|err| err.to_string())?;
    println!("ECC Private Key: {}", key.private_key_hex());
    println!("ECC Public Key: {}", key.public_key().to_hex());
    println!("Ledger Address: {}", key.public_key().ledger_address());
    Ok(())
}

fn cmd_sign(flags: Flags) -> Result<(), String> {
    let response = response_arg(&flags, 0)?;
    let message = flags
        .positional
        .get(1)
        .ok_or_else(|| "missing <message>".to_string())?;
    let curve = flags.curve.unwrap_or_default();
    let nonce = if flags.deterministic {
        NonceMode::Deterministic
    } else {
        NonceMode::Random
    };
    let key = derive_private_key(&response, curve).map_err(|err| err.to_string())?;
    let signature = sign(&key, message.as_bytes(), nonce).map_err(|err| err.to_string())?;
    println!("{}", signature.to_der_hex());
    Ok(())
}

fn cmd_verify(flags: Flags) -> Result<(), String> {
    if flags.positional.len() != 3 {
        return Err(
            "Usage: pufsign verify <public_key_hex> <message> <signature_hex> [--curve ...]"
                .to_string(),
        );
    }
    let curve = flags.curve.unwrap_or_default();
    let public = PublicKey::from_hex(curve, &flags.positional[0]).map_err(|err| err.to_string())?;
    let signature =
        Signature::from_hex(curve, &flags.positional[2]).map_err(|err| err.to_string())?;
    let valid = verify(&public, flags.positional[1].as_bytes(), &signature)
        .map_err(|err| err.to_string())?;
    if valid {
        println!("signature valid");
        Ok(())
    } else {
        Err("signature invalid".to_string())
    }
}

fn main() {
    let mut args = env::args().skip(1);
    let command = args.next();
    let rest: Vec<String> = args.collect();
    let Some(command) = command.filter(|c| !matches!(c.as_str(), "help" | "--help" | "-h")) else {
        print_help();
        return;
    };
    init_logging();
    let flags = parse_flags(rest).unwrap_or_else(|err| fatal(&err));
    let result = match command.as_str() {
        "run" => cmd_run(flags),
        "respond" => cmd_respond(flags),
        "derive" => cmd_derive(flags),
        "sign" => cmd_sign(flags),
        "verify" => cmd_verify(flags),
        other => Err(format!("Unknown subcommand: {other}")),
    };
    if let Err(err) = result {
        fatal(&format!("error: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_split_positional_and_named() {
        let flags = parse_flags(args(&[
            "abcd",
            "--curve",
            "secp256k1",
            "hello",
            "--deterministic",
            "--stages",
            "64",
        ]))
        .unwrap();
        assert_eq!(flags.positional, vec!["abcd", "hello"]);
        assert_eq!(flags.curve, Some(Curve::Secp256k1));
        assert!(flags.deterministic);
        assert_eq!(flags.stages, Some(64));
    }

    #[test]
    fn flags_reject_unknown_and_missing_values() {
        assert!(parse_flags(args(&["--bogus"])).is_err());
        assert!(parse_flags(args(&["--stages"])).is_err());
        assert!(parse_flags(args(&["--stages", "many"])).is_err());
    }

    #[test]
    fn cli_overrides_defaults() {
        let flags = parse_flags(args(&["--puf-seed", "7", "--message", "hi"])).unwrap();
        let cfg = build_config(&flags).unwrap();
        assert_eq!(cfg.puf_seed, 7);
        assert_eq!(cfg.message, "hi");
    }

    #[test]
    fn zero_stages_rejected() {
        let flags = parse_flags(args(&["--stages", "0"])).unwrap();
        assert!(build_config(&flags).is_err());
    }
}
