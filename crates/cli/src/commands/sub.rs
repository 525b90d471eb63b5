// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `genectl sub` - submit workflows, single jobs and repeated jobs.

use crate::client::DaemonClient;
use crate::Cli;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use genedag_workflow::{
    execution_name, execution_namespace, fetch_tools, instantiate_workflow, parse_workflow,
    set_workflow_defaults, to_execution, validate_workflow, Input, JobInfo, Volume, VolumeSource,
    Workflow,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct SubArgs {
    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Subcommand)]
enum SubCommands {
    /// Submit a workflow from a YAML file
    Workflow(WorkflowArgs),
    /// Submit a single job that runs one shell script
    Job(JobArgs),
    /// Submit a group of jobs, one per line of a script file
    Repjob(RepJobArgs),
}

#[derive(Args)]
struct WorkflowArgs {
    /// Workflow YAML file
    file: PathBuf,

    /// Input values, key=value (value parsed as JSON, else as a string)
    #[arg(long = "input", value_name = "KEY=VALUE")]
    inputs: Vec<String>,

    /// JSON file holding an object of input values
    #[arg(long)]
    input_json: Option<PathBuf>,
}

#[derive(Args)]
struct JobArgs {
    /// Absolute path of the shell script within the container
    script: PathBuf,

    /// Memory resource required to run this job
    #[arg(long, default_value = "1G")]
    memory: String,

    /// Cpu resource required to run this job
    #[arg(long, default_value = "1")]
    cpu: String,

    /// Shell used to execute the job script
    #[arg(long, default_value = "sh")]
    shell: String,

    /// Tool used by the job, format name:version
    #[arg(long)]
    tool: String,

    /// Name of the pvc holding the job script and sample data
    #[arg(long)]
    pvc: String,

    /// Mount path of the pvc within the container; defaults to the
    /// directory of the job script
    #[arg(long)]
    mount_path: Option<PathBuf>,
}

#[derive(Args)]
struct RepJobArgs {
    /// Script file; every non-comment line is one job command
    script: PathBuf,

    #[arg(long, default_value = "1G")]
    memory: String,

    #[arg(long, default_value = "1")]
    cpu: String,

    #[arg(long)]
    tool: String,

    #[arg(long)]
    pvc: String,

    #[arg(long)]
    mount_path: Option<PathBuf>,
}

pub async fn run(cli: &Cli, args: &SubArgs) -> Result<()> {
    match &args.command {
        SubCommands::Workflow(workflow_args) => {
            let data = std::fs::read_to_string(&workflow_args.file)
                .with_context(|| format!("read workflow file {:?}", workflow_args.file))?;
            let workflow = parse_workflow(&data)?;
            let inputs = collect_inputs(workflow_args)?;
            process_workflow(cli, workflow, inputs).await
        }
        SubCommands::Job(job_args) => {
            let workflow = single_job_workflow(job_args)?;
            process_workflow(cli, workflow, HashMap::new()).await
        }
        SubCommands::Repjob(rep_args) => {
            let workflow = repeated_job_workflow(rep_args)?;
            process_workflow(cli, workflow, HashMap::new()).await
        }
    }
}

/// Shared submission path: defaults, validation, instantiation,
/// translation and submission (or a dry-run print).
async fn process_workflow(
    cli: &Cli,
    mut workflow: Workflow,
    inputs: HashMap<String, Value>,
) -> Result<()> {
    set_workflow_defaults(&mut workflow);

    let errors = validate_workflow(&workflow);
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("{error}");
        }
        bail!("workflow validation failed with {} error(s)", errors.len());
    }

    // fetch_tools may do blocking HTTP; keep it off the async runtime
    let tool_repo = cli.tool_repo.clone();
    let tools = tokio::task::spawn_blocking(move || fetch_tools(&tool_repo))
        .await
        .context("tool repository task failed")??;
    let instantiated = instantiate_workflow(&workflow, &inputs, &tools)?;

    let namespace = if cli.namespace == "default" {
        execution_namespace(&instantiated.inputs)
    } else {
        cli.namespace.clone()
    };
    let name = execution_name(&instantiated.inputs);
    let execution = to_execution(&instantiated, &namespace, &name)?;

    if cli.dry_run {
        print!("{}", serde_yaml::to_string(&execution)?);
        return Ok(());
    }

    let client = DaemonClient::new(&cli.socket);
    let key = client.submit_execution(execution).await?;
    println!("The workflow has been submitted successfully, execution {key} created.");
    println!();
    println!("Query the status of the workflow execution:");
    println!();
    println!("    genectl get execution {name} -n {namespace}");
    println!();
    println!("or inspect its vertices:");
    println!();
    println!("    genectl describe execution {name} -n {namespace}");
    Ok(())
}

fn collect_inputs(args: &WorkflowArgs) -> Result<HashMap<String, Value>> {
    let mut inputs = HashMap::new();
    if let Some(path) = &args.input_json {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read input file {path:?}"))?;
        let object: HashMap<String, Value> =
            serde_json::from_str(&data).context("input file must hold a JSON object")?;
        inputs.extend(object);
    }
    for pair in &args.inputs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("--input must be key=value, got {pair:?}");
        };
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
        inputs.insert(key.to_string(), value);
    }
    Ok(inputs)
}

/// Wrap one shell-script invocation into a generated one-job workflow.
fn single_job_workflow(args: &JobArgs) -> Result<Workflow> {
    let mount_path = mount_path_for(&args.script, args.mount_path.as_deref())?;
    let job_name = job_name_from(&args.script)?;
    let command = format!("{} {}", args.shell, args.script.display());

    Ok(generated_workflow(
        &job_name,
        &args.tool,
        &args.cpu,
        &args.memory,
        &args.pvc,
        &mount_path,
        vec![command],
    ))
}

/// One job per non-comment line of the script file; the lines run as a
/// parallel group.
fn repeated_job_workflow(args: &RepJobArgs) -> Result<Workflow> {
    let data = std::fs::read_to_string(&args.script)
        .with_context(|| format!("read job script {:?}", args.script))?;
    let commands: Vec<String> = data
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    if commands.is_empty() {
        bail!("no commands found in {:?}", args.script);
    }

    let mount_path = mount_path_for(&args.script, args.mount_path.as_deref())?;
    let job_name = job_name_from(&args.script)?;
    Ok(generated_workflow(
        &job_name,
        &args.tool,
        &args.cpu,
        &args.memory,
        &args.pvc,
        &mount_path,
        commands,
    ))
}

fn generated_workflow(
    job_name: &str,
    tool: &str,
    cpu: &str,
    memory: &str,
    pvc: &str,
    mount_path: &str,
    commands: Vec<String>,
) -> Workflow {
    let mut workflow = Workflow::default();
    workflow.inputs.insert(
        "executionName".to_string(),
        Input {
            value: Some(Value::from(generate_job_id(job_name))),
            input_type: "string".into(),
            ..Input::default()
        },
    );
    workflow.volumes.insert(
        "data".to_string(),
        Volume {
            mount_path: mount_path.to_string(),
            mount_from: VolumeSource {
                pvc: pvc.to_string(),
            },
        },
    );
    workflow.jobs.insert(
        job_name.to_string(),
        JobInfo {
            tool: tool.to_string(),
            resources: genedag_workflow::Resources {
                cpu: cpu.to_string(),
                memory: memory.to_string(),
            },
            commands,
            ..JobInfo::default()
        },
    );
    workflow
}

fn mount_path_for(script: &Path, explicit: Option<&Path>) -> Result<String> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => script
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/")),
    };
    Ok(path.display().to_string())
}

/// Derive a DNS-safe job name from the script file name.
fn job_name_from(script: &Path) -> Result<String> {
    let stem = script
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("job");
    let name: String = stem
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let name = name.trim_matches('-').to_string();
    if name.is_empty() {
        bail!("cannot derive a job name from {script:?}");
    }
    Ok(name.chars().take(40).collect())
}

/// `{name}-{YYYY-MMDD-HHMMSS}-{nonce}` as the generated execution name.
fn generate_job_id(name: &str) -> String {
    let stamp = chrono::Utc::now().format("%Y-%m%d-%H%M%S");
    let nonce: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(5)
        .collect();
    format!("{name}-{stamp}-{nonce}")
}
