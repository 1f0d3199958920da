//! Command dispatch: one function per subcommand

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::ShapeTreeService;
use crate::application::{ApplicationResult, ValueDriverOutcome};
use crate::cli::args::{Cli, Commands, ConfigCommands, GroupCommands, ShapeCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::{output, render};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Capability, Direction, HostCapabilities, NodeRequest, NodeType};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{InfraError, KeyDocument};

type Service = ShapeTreeService<KeyDocument>;

/// Execute the parsed command line.
pub fn execute(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, run `shapetree --help`".to_string(),
        ));
    };
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;
    let settings = Settings::load(Some(&project_dir))?;
    let container = ServiceContainer::new(settings);
    debug!(project = %project_dir.display(), "executing command");

    match command {
        Commands::Init {
            key,
            no_split_axis,
            no_combination,
            no_in_between,
            force,
        } => {
            let mut capabilities = container.settings.capabilities();
            for (disabled, capability) in [
                (*no_split_axis, Capability::SplitAxis),
                (*no_combination, Capability::Combination),
                (*no_in_between, Capability::InBetween),
            ] {
                if disabled {
                    capabilities.remove(capability);
                }
            }
            cmd_init(&container, &project_dir, key, capabilities, *force)
        }
        Commands::Group { command } => match command {
            GroupCommands::Add { parent } => cmd_group_add(&container, &project_dir, parent.as_deref()),
        },
        Commands::Shape { command } => match command {
            ShapeCommands::Add { parent, shape } => {
                cmd_shape_add(&container, &project_dir, parent.as_deref(), shape.as_deref())
            }
            ShapeCommands::Remove { shape } => cmd_shape_remove(&container, &project_dir, shape),
        },
        Commands::Insert {
            node_type,
            name,
            data_path,
            parent,
        } => cmd_insert(
            &container,
            &project_dir,
            *node_type,
            name,
            data_path.as_deref(),
            parent.as_deref(),
        ),
        Commands::Rename { node, name } => cmd_rename(&container, &project_dir, node, name),
        Commands::Move { node, parent } => cmd_move(&container, &project_dir, node, parent.as_deref()),
        Commands::Up { node } => cmd_reorder(&container, &project_dir, node, Direction::Up),
        Commands::Down { node } => cmd_reorder(&container, &project_dir, node, Direction::Down),
        Commands::Tree => cmd_tree(&container, &project_dir),
        Commands::Show { node } => cmd_show(&container, &project_dir, node),
        Commands::Drivers => cmd_drivers(&container, &project_dir),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cmd_config_show(&container),
            ConfigCommands::Init { global } => cmd_config_init(&container, &project_dir, *global),
            ConfigCommands::Path => cmd_config_path(&project_dir),
        },
        Commands::Completion { .. } => Ok(()),
    }
}

fn resolve_project_dir(dir: Option<&Path>) -> CliResult<PathBuf> {
    match dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("determine current directory", e).into()),
    }
}

/// Loads the document, runs `f`, and saves only when `f` succeeds.
fn mutate<T>(
    container: &ServiceContainer,
    project_dir: &Path,
    f: impl FnOnce(&mut Service) -> ApplicationResult<T>,
) -> CliResult<T> {
    let mut service = container.open(project_dir)?;
    let result = f(&mut service)?;
    container.close(project_dir, service)?;
    Ok(result)
}

fn inspect<T>(
    container: &ServiceContainer,
    project_dir: &Path,
    f: impl FnOnce(&Service) -> CliResult<T>,
) -> CliResult<T> {
    let service = container.open(project_dir)?;
    f(&service)
}

#[instrument(level = "debug", skip(container))]
fn cmd_init(
    container: &ServiceContainer,
    project_dir: &Path,
    key: &str,
    capabilities: HostCapabilities,
    force: bool,
) -> CliResult<()> {
    let store = container.document_store(project_dir);
    let document = container.new_document(key, Some(capabilities));
    store.create(&document, force)?;
    output::success(&format!("Created {}", store.path().display()));
    let caps = document.key.capabilities.iter().map(|c| c.as_str()).join(", ");
    output::detail(&format!("capabilities: {}", if caps.is_empty() { "none" } else { caps.as_str() }));
    Ok(())
}

fn cmd_group_add(container: &ServiceContainer, project_dir: &Path, parent: Option<&str>) -> CliResult<()> {
    let inserted = mutate(container, project_dir, |svc| svc.add_group(parent))?;
    output::action("Added group", &format!("{} (index {})", inserted.name, inserted.index));
    Ok(())
}

fn cmd_shape_add(
    container: &ServiceContainer,
    project_dir: &Path,
    parent: Option<&str>,
    shape: Option<&str>,
) -> CliResult<()> {
    let added = mutate(container, project_dir, |svc| svc.add_shapekey(parent, shape))?;
    output::action(
        "Added shape key",
        &format!("{} (index {})", added.inserted.name, added.inserted.index),
    );
    if added.created_shape {
        output::success_detail(&format!("created shape {}", added.inserted.name));
    }
    match added.value_driver {
        ValueDriverOutcome::Installed => output::success_detail(&"shape value follows node weight"),
        ValueDriverOutcome::Retargeted => {
            output::success_detail(&"existing shape driver now drives the node influence")
        }
        ValueDriverOutcome::FrameworkOwned => {
            output::warning(&"shape value is owned by a pose driver and was left unchanged")
        }
    }
    Ok(())
}

fn cmd_shape_remove(container: &ServiceContainer, project_dir: &Path, shape: &str) -> CliResult<()> {
    let orphans = mutate(container, project_dir, |svc| {
        svc.remove_shape(shape)?;
        Ok(svc.orphans().iter().map(|n| n.name().to_string()).collect::<Vec<_>>())
    })?;
    output::action("Removed shape", &shape);
    if !orphans.is_empty() {
        output::warning(&format!("invalid nodes: {}", orphans.join(", ")));
    }
    Ok(())
}

fn cmd_insert(
    container: &ServiceContainer,
    project_dir: &Path,
    node_type: NodeType,
    name: &str,
    data_path: Option<&str>,
    parent: Option<&str>,
) -> CliResult<()> {
    let request = match node_type {
        NodeType::Group => NodeRequest::group(name, parent),
        NodeType::Shapekey => NodeRequest::shapekey(name, parent),
        _ => {
            let Some(data_path) = data_path else {
                return Err(CliError::InvalidArgs(format!(
                    "{} nodes need --data-path",
                    node_type.label()
                )));
            };
            NodeRequest::linked(node_type, name, data_path, parent)
        }
    };
    let (inserted, resolved) = mutate(container, project_dir, |svc| {
        let inserted = svc.insert(request)?;
        let resolved = svc.tree().params(svc.host(), inserted.index).is_some();
        Ok((inserted, resolved))
    })?;
    output::action(
        &format!("Added {}", node_type.label()),
        &format!("{} (index {})", inserted.name, inserted.index),
    );
    if !resolved {
        output::warning(&format!("backing data of {} not found, node is invalid", inserted.name));
    }
    Ok(())
}

fn cmd_rename(container: &ServiceContainer, project_dir: &Path, node: &str, name: &str) -> CliResult<()> {
    let event = mutate(container, project_dir, |svc| svc.rename(node, name))?;
    output::action("Renamed", &format!("{} -> {}", event.previous_value, event.value));
    if event.value != event.requested {
        output::detail(&format!("\"{}\" is taken", event.requested));
    }
    Ok(())
}

fn cmd_move(container: &ServiceContainer, project_dir: &Path, node: &str, parent: Option<&str>) -> CliResult<()> {
    let moved = mutate(container, project_dir, |svc| svc.move_node(node, parent))?;
    output::action("Moved", &format!("{node} to index {}", moved.index));
    if moved.plan.is_some() {
        output::success_detail(&"weight driver regenerated");
    }
    Ok(())
}

fn cmd_reorder(container: &ServiceContainer, project_dir: &Path, node: &str, direction: Direction) -> CliResult<()> {
    let index = mutate(container, project_dir, |svc| svc.reorder(node, direction))?;
    output::action("Moved", &format!("{node} to index {index}"));
    Ok(())
}

fn cmd_tree(container: &ServiceContainer, project_dir: &Path) -> CliResult<()> {
    inspect(container, project_dir, |svc| {
        if svc.tree().is_empty() {
            output::info(&"(empty tree)");
        } else {
            output::info(&render::render(svc.tree(), svc.host()));
        }
        Ok(())
    })
}

fn cmd_show(container: &ServiceContainer, project_dir: &Path, node: &str) -> CliResult<()> {
    inspect(container, project_dir, |svc| {
        let report = svc.report(node)?;
        let list = |names: &[String]| {
            if names.is_empty() {
                "-".to_string()
            } else {
                names.join(", ")
            }
        };
        output::header(&report.name);
        output::detail(&format!("type:      {}", report.node_type.label()));
        output::detail(&format!("index:     {}", report.index));
        output::detail(&format!("depth:     {}", report.depth));
        output::detail(&format!("parent:    {}", report.parent.as_deref().unwrap_or("-")));
        output::detail(&format!("ancestors: {}", list(&report.ancestors)));
        output::detail(&format!("children:  {}", list(&report.children)));
        output::detail(&format!("siblings:  {}", list(&report.siblings)));
        output::detail(&format!("subtree:   {}", list(&report.subtree)));
        if let Some(data_path) = &report.data_path {
            output::detail(&format!("data path: {data_path}"));
        }
        match &report.params {
            Some(params) => {
                let host = svc.host();
                let value = |name: &str| {
                    host.evaluate_property(name)
                        .map_or_else(|| "?".to_string(), |v| format!("{v:.3}"))
                };
                output::detail(&format!("influence: {} = {}", params.influence, value(&params.influence)));
                output::detail(&format!("weight:    {} = {}", params.weight, value(&params.weight)));
            }
            None => output::failure(&"parameters unresolved"),
        }
        if let Some(shape) = &report.shape {
            let value = svc.host().evaluate_shape(&shape.name).unwrap_or(shape.value);
            output::detail(&format!("shape:     {} = {value:.3}", shape.name));
        }
        match &report.orphaned {
            None => output::success_detail(&"valid"),
            Some(cause) => output::failure(&format!("invalid: {cause}")),
        }
        Ok(())
    })
}

fn cmd_drivers(container: &ServiceContainer, project_dir: &Path) -> CliResult<()> {
    inspect(container, project_dir, |svc| {
        let drivers = svc.host().drivers();
        if drivers.is_empty() {
            output::info(&"(no drivers)");
        }
        for driver in drivers {
            let variables = driver
                .variables
                .iter()
                .map(|v| format!("{}={}", v.name, v.target.data_path))
                .join(", ");
            output::info(&format!("{} = {}  [{}]", driver.data_path, driver.expression, variables));
        }
        Ok(())
    })
}

fn cmd_config_show(container: &ServiceContainer) -> CliResult<()> {
    output::info(&container.settings.to_toml()?);
    Ok(())
}

fn cmd_config_init(container: &ServiceContainer, project_dir: &Path, global: bool) -> CliResult<()> {
    let path = if global {
        global_config_path()
            .ok_or_else(|| CliError::Usage("cannot determine global config directory".to_string()))?
    } else {
        local_config_path(project_dir)
    };
    if container.fs.exists(&path) {
        return Err(InfraError::DocumentExists(path).into());
    }
    container
        .fs
        .ensure_parent(&path)
        .and_then(|_| container.fs.write_atomic(&path, &Settings::template()))
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    output::success(&format!("Created {}", path.display()));
    Ok(())
}

fn cmd_config_path(project_dir: &Path) -> CliResult<()> {
    let show = |label: &str, path: &Path| {
        let marker = if path.exists() { "exists" } else { "missing" };
        output::detail(&format!("{label}: {} ({marker})", path.display()));
    };
    match global_config_path() {
        Some(path) => show("global", &path),
        None => output::detail(&"global: (unavailable)"),
    }
    show("local", &local_config_path(project_dir));
    Ok(())
}
