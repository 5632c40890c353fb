use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use platter_core::{
    AudioSource, BendScript, OfflineOptions, Orientation, PlatterConfig, decode_audio_file,
    diagnostics::init_tracing_from_config,
    fixtures::{demo_script, demo_source},
    generate_report,
    report::write_report,
    render_offline, write_wav,
};

#[derive(Debug, Parser)]
#[command(name = "platter-cli")]
#[command(about = "Headless tools for rendering turntable bend scripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Render {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        script: PathBuf,

        #[arg(long, default_value = "data/render.wav")]
        output: PathBuf,

        #[arg(long)]
        report: Option<PathBuf>,

        #[arg(long)]
        reverse: bool,
    },
    Demo {
        #[arg(long, default_value = "data/demo")]
        output_dir: PathBuf,

        #[arg(long, default_value_t = 4.0)]
        seconds: f64,
    },
    Monitor {
        #[arg(long)]
        script: Option<PathBuf>,

        #[arg(long)]
        capacity: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = PlatterConfig::load_or_default(cli.config.as_deref())?;
    if let Some(log_dir) = cli.log_dir {
        config.diagnostics.log_dir = log_dir;
    }
    let _telemetry = init_tracing_from_config(&config.diagnostics)?;

    match cli.command {
        Commands::Render {
            input,
            script,
            output,
            report,
            reverse,
        } => {
            let source = decode_audio_file(&input)?;
            let script = BendScript::load(&script)?;
            let mut options = OfflineOptions::from(&config);
            if reverse {
                options.session.orientation = Orientation::Reversed;
            }
            render_to_disk(Some(source), &script, &options, &output, report.as_deref())?;
        }
        Commands::Demo {
            output_dir,
            seconds,
        } => {
            std::fs::create_dir_all(&output_dir)?;
            let options = OfflineOptions::from(&config);
            let script = demo_script(options.block_size);
            script.save(&output_dir.join("demo.script.json"))?;
            let source = demo_source(options.sample_rate, seconds);
            render_to_disk(
                Some(source),
                &script,
                &options,
                &output_dir.join("demo.wav"),
                Some(output_dir.join("demo.report.json").as_path()),
            )?;
        }
        Commands::Monitor { script, capacity } => {
            let mut options = OfflineOptions::from(&config);
            if let Some(capacity) = capacity {
                options.event_capacity = capacity;
            }
            let script = match script {
                Some(path) => BendScript::load(&path)?,
                None => demo_script(options.block_size),
            };
            let source = demo_source(options.sample_rate, 1.0);
            let render = render_offline(Some(source), &script, &options);
            for event in &render.events {
                println!("{event}");
            }
            println!(
                "{} events, {} dropped",
                render.events.len(),
                render.events_dropped
            );
        }
    }

    Ok(())
}

fn render_to_disk(
    source: Option<AudioSource>,
    script: &BendScript,
    options: &OfflineOptions,
    output: &Path,
    report_path: Option<&Path>,
) -> anyhow::Result<()> {
    let render = render_offline(source, script, options);
    write_wav(output, &render)?;
    tracing::info!(path = %output.display(), frames = render.frame_count(), "render written");

    if let Some(report_path) = report_path {
        let report = generate_report(&render);
        write_report(report_path, &report)?;
        tracing::info!(
            path = %report_path.display(),
            hash = %report.audio_hash,
            "render report generated"
        );
    }
    Ok(())
}
