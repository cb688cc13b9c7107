use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use hlsl_forge::driver::{effect_registration_xml, Driver};
use hlsl_forge::translator::utils::type_ident;
use hlsl_forge::{load_source_from_path, ShaderSource, TranslateOptions, Translation};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Clone)]
struct Cli {
    inputs: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    jobs: Option<usize>,
    bytecode: bool,
    dxc: Option<PathBuf>,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --input"));
                };
                cli.inputs.push(PathBuf::from(v));
                i += 2;
            }
            "--outputdir" | "--output-dir" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --output-dir"));
                };
                cli.output_dir = Some(PathBuf::from(v));
                i += 2;
            }
            "--jobs" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --jobs"));
                };
                let jobs: usize = v
                    .parse()
                    .map_err(|e| anyhow!("invalid value for --jobs: {v} ({e})"))?;
                cli.jobs = Some(jobs);
                i += 2;
            }
            "--bytecode" => {
                cli.bytecode = true;
                i += 1;
            }
            "--dxc" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --dxc"));
                };
                cli.dxc = Some(PathBuf::from(v));
                i += 2;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --input <shader.json>, --output-dir <dir>, --jobs <n>, --bytecode, --dxc <path>)"
                ));
            }
        }
    }
    if cli.inputs.is_empty() {
        return Err(anyhow!("at least one --input <shader.json> is required"));
    }
    Ok(cli)
}

/// File stem for a shader's outputs; keeps the namespace so same-named shaders don't collide.
fn output_stem(name: &str) -> String {
    type_ident(name)
}

fn write_outputs(output_dir: &Path, source: &ShaderSource, t: &Translation) -> Result<()> {
    let stem = output_stem(&t.name);
    if let Some(program) = &t.program {
        let path = output_dir.join(format!("{stem}.hlsl"));
        std::fs::write(&path, program).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote program");
    }

    let path = output_dir.join(format!("{stem}.dispatch.json"));
    let json = serde_json::to_string_pretty(t)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

    if let Some(bytecode) = &t.bytecode {
        let path = output_dir.join(format!("{stem}.cso"));
        std::fs::write(&path, bytecode).with_context(|| format!("failed to write {}", path.display()))?;
    }

    if source.attributes.input_count.is_some() {
        let path = output_dir.join(format!("{stem}.effect.xml"));
        std::fs::write(&path, effect_registration_xml(&t.name, &source.attributes))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    let sources = cli
        .inputs
        .iter()
        .map(load_source_from_path)
        .collect::<Result<Vec<_>>>()?;

    let output_dir = cli.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let options = TranslateOptions {
        emit_bytecode: cli.bytecode,
        compiler_path: cli.dxc.clone(),
        ..TranslateOptions::default()
    };
    let jobs = cli
        .jobs
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
    let driver = Driver::new(options, jobs);
    let translations = driver.translate_all(&sources);

    let mut failed = 0;
    for (source, t) in sources.iter().zip(&translations) {
        for d in &t.diagnostics {
            eprintln!("{d}");
        }
        write_outputs(&output_dir, source, t)?;
        if !t.is_dispatchable() {
            failed += 1;
        }
    }

    tracing::info!(shaders = translations.len(), failed, "translation finished");
    if failed > 0 {
        return Err(anyhow!("{failed} shader(s) failed to translate"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_cli_collects_repeated_inputs() {
        let cli = parse_cli(&args(&[
            "--input", "a.json", "--input", "b.json", "--output-dir", "out", "--jobs", "2", "--bytecode",
        ]))
        .unwrap();
        assert_eq!(cli.inputs, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert_eq!(cli.output_dir.as_ref().unwrap(), &PathBuf::from("out"));
        assert_eq!(cli.jobs, Some(2));
        assert!(cli.bytecode);
    }

    #[test]
    fn parse_cli_rejects_unknown_and_missing() {
        assert!(parse_cli(&args(&["--input"])).is_err());
        assert!(parse_cli(&args(&["--wat"])).is_err());
        assert!(parse_cli(&args(&[])).is_err());
        assert!(parse_cli(&args(&["--input", "a.json", "--jobs", "many"])).is_err());
    }

    #[test]
    fn output_stem_keeps_namespace() {
        assert_eq!(output_stem("Demo.Effects.Blur"), "Demo_Effects_Blur");
        assert_eq!(output_stem("Plain"), "Plain");
        assert_ne!(output_stem("A.Blur"), output_stem("B.Blur"));
    }
}
