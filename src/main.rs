//! o3dexport CLI
//!
//! Exports a scene dump as an O3DE asset bundle, inspects what an export
//! would write, dumps material translations and plans a re-import.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use o3dexport_core::logging::{self, TracingConfig};
use o3dexport_core::Axis;
use o3dexport_export::settings::ensure_project_dir;
use o3dexport_export::{
    plan_export, translate_material, CommandMeshExporter, CopyMeshExporter, ExportRun, ExportSettings, FsImageIo,
    MeshExporter, OverwritePolicy, TextureNameRegistry,
};
use o3dexport_import::{AssetPaths, InMemoryEditor, SceneImporter};
use o3dexport_scene::{Scene, SceneLoader};

/// o3dexport - export authoring-tool scenes to O3DE
#[derive(Parser)]
#[command(name = "o3dexport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene dump into a project
    Export(ExportArgs),

    /// Show what an export would write
    Inspect(InspectArgs),

    /// Print the channel translation of materials as JSON
    Translate(TranslateArgs),

    /// Run the importer against an in-memory level and print the result
    ImportPlan(ImportPlanArgs),
}

#[derive(Args)]
struct SelectionArgs {
    /// Export the selected objects only, without a scene graph
    #[arg(long)]
    selected_only: bool,

    /// Drop images with unsupported formats instead of failing
    #[arg(long)]
    allow_invalid_textures: bool,
}

#[derive(Args)]
struct ExportArgs {
    /// Scene dump written by the authoring tool
    dump: PathBuf,

    /// Project or gem directory to export into
    #[arg(short, long)]
    output: PathBuf,

    /// Scene name; defaults to the name in the dump or its file stem
    #[arg(short, long)]
    scene: Option<String>,

    /// Forward axis of the exported meshes
    #[arg(long, default_value = "Y", allow_hyphen_values = true)]
    forward: Axis,

    /// Up axis of the exported meshes
    #[arg(long, default_value = "Z", allow_hyphen_values = true)]
    up: Axis,

    /// Replace existing texture files
    #[arg(long)]
    overwrite_textures: bool,

    /// Replace existing material files
    #[arg(long)]
    overwrite_materials: bool,

    /// Replace existing mesh files
    #[arg(long)]
    overwrite_meshes: bool,

    /// Replace an existing scene graph
    #[arg(long)]
    overwrite_scene_graph: bool,

    /// Replace every existing file
    #[arg(long)]
    overwrite_all: bool,

    /// Flip the X channel of normal maps
    #[arg(long)]
    flip_normal_x: bool,

    /// Do not flip the Y channel of normal maps
    #[arg(long)]
    no_flip_normal_y: bool,

    #[command(flatten)]
    selection: SelectionArgs,

    /// Program that writes one mesh per call
    #[arg(long)]
    mesh_tool: Option<PathBuf>,

    /// Extra argument for the mesh tool (can be repeated)
    #[arg(long = "mesh-tool-arg")]
    mesh_tool_args: Vec<String>,

    /// Directory with meshes already written as <mesh>.fbx; defaults to the dump's directory
    #[arg(long, conflicts_with = "mesh_tool")]
    mesh_source: Option<PathBuf>,

    /// Directory for the export log; defaults to the dump's directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Do not write an export log
    #[arg(long, conflicts_with = "log_dir")]
    no_log: bool,

    /// Export even if the output is not a project or gem directory
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// Scene dump written by the authoring tool
    dump: PathBuf,

    #[command(flatten)]
    selection: SelectionArgs,
}

#[derive(Args)]
struct TranslateArgs {
    /// Scene dump written by the authoring tool
    dump: PathBuf,

    /// Only this material
    #[arg(short, long)]
    material: Option<String>,
}

#[derive(Args)]
struct ImportPlanArgs {
    /// Project the scene was exported into
    #[arg(short, long)]
    project: PathBuf,

    /// Name of the exported scene
    #[arg(short, long)]
    scene: String,

    /// Save after every N new entities
    #[arg(long, default_value = "0")]
    save_rate: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with_config(TracingConfig::from_verbosity(cli.verbose));

    match cli.command {
        Commands::Export(args) => cmd_export(args),
        Commands::Inspect(args) => cmd_inspect(args, cli.format),
        Commands::Translate(args) => cmd_translate(args),
        Commands::ImportPlan(args) => cmd_import_plan(args, cli.format),
    }
}

fn load_scene(dump: &Path) -> Result<Scene> {
    SceneLoader::load_file(dump).with_context(|| format!("Failed to load scene dump {}", dump.display()))
}

fn dump_dir(dump: &Path) -> PathBuf {
    dump.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn cmd_export(args: ExportArgs) -> Result<()> {
    if !args.force {
        ensure_project_dir(&args.output)
            .context("Pass --force to export into a directory without project.json or gem.json")?;
    }

    let mut scene = load_scene(&args.dump)?;
    let scene_name = args
        .scene
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| scene.name.clone());

    let overwrite = if args.overwrite_all {
        OverwritePolicy::all()
    } else {
        OverwritePolicy {
            textures: args.overwrite_textures,
            materials: args.overwrite_materials,
            meshes: args.overwrite_meshes,
            scene_graph: args.overwrite_scene_graph,
        }
    };
    let settings = ExportSettings::new(&args.output, scene_name)
        .with_axes(args.forward, args.up)
        .with_overwrite(overwrite)
        .with_normal_flip(args.flip_normal_x, !args.no_flip_normal_y)
        .with_allow_invalid_textures(args.selection.allow_invalid_textures)
        .with_selected_only(args.selection.selected_only);
    settings.validate().context("Invalid export settings")?;

    let mut mesh_exporter: Box<dyn MeshExporter> = match &args.mesh_tool {
        Some(program) => Box::new(CommandMeshExporter::new(program).with_args(args.mesh_tool_args.iter().cloned())),
        None => Box::new(CopyMeshExporter::new(
            args.mesh_source.clone().unwrap_or_else(|| dump_dir(&args.dump)),
        )),
    };
    let log_dir = if args.no_log {
        None
    } else {
        Some(args.log_dir.clone().unwrap_or_else(|| dump_dir(&args.dump)))
    };

    let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new())
        .context("Failed to discover scene assets")?;
    let run = match ExportRun::start(
        &mut scene,
        &graph,
        &settings,
        mesh_exporter.as_mut(),
        &FsImageIo,
        log_dir.as_deref(),
    ) {
        Ok(run) => run,
        Err(err) => {
            if let Some(hint) = err.retry_hint() {
                eprintln!("{}", hint);
            }
            if err.is_precondition_failure() {
                info!("Nothing was written");
            }
            return Err(err).context("Cannot start export");
        }
    };
    if let Some(path) = run.log_path() {
        info!("Writing export log to {}", path.display());
    }

    let span = logging::progress_span("export", run.expected_events());
    let _guard = span.enter();

    let mut failed = 0;
    let expected = run.expected_events();
    for event in run {
        if event.outcome.is_failure() {
            error!("{}", event);
            failed += 1;
        }
        println!("{}", event);
    }

    println!("Exported scene '{}' to {}", settings.scene_name, settings.scene_dir().display());
    if failed > 0 {
        bail!("{} of {} export units failed", failed, expected);
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> Result<()> {
    let scene = load_scene(&args.dump)?;
    let settings = ExportSettings::new(".", scene.name.clone())
        .with_allow_invalid_textures(args.selection.allow_invalid_textures)
        .with_selected_only(args.selection.selected_only);
    let graph = plan_export(&scene, &settings, &mut TextureNameRegistry::new())
        .context("Failed to discover scene assets")?;

    match format {
        OutputFormat::Json => {
            let textures: Vec<_> = graph
                .textures()
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.original_name,
                        "file": t.sanitized_name,
                        "variants": t.variant_names().into_iter().map(|(_, name)| name).collect::<Vec<_>>(),
                        "normal_map": t.is_normal_map,
                    })
                })
                .collect();
            let summary = serde_json::json!({
                "scene": scene.name,
                "recursive": graph.is_recursive(),
                "textures": textures,
                "materials": graph.materials().iter().map(|m| &m.name).collect::<Vec<_>>(),
                "meshes": graph.meshes().iter().map(|m| &m.sanitized_name).collect::<Vec<_>>(),
                "expected_events": graph.expected_events(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!("Scene: {}", scene.name);
            println!("Objects: {}", scene.len());
            println!("Textures ({} files):", graph.texture_export_count());
            for texture in graph.textures() {
                println!("  {} -> {}", texture.original_name, texture.sanitized_name);
                for (_, variant) in texture.variant_names() {
                    println!("    {}", variant);
                }
            }
            println!("Materials ({}):", graph.materials().len());
            for material in graph.materials() {
                println!("  {}", material.name);
            }
            println!("Meshes ({}):", graph.meshes().len());
            for mesh in graph.meshes() {
                println!("  {} -> {}", mesh.original_name, mesh.sanitized_name);
            }
            println!("Scene graph: {}", if graph.is_recursive() { "yes" } else { "no" });
            println!("Expected progress events: {}", graph.expected_events());
        }
    }
    Ok(())
}

fn cmd_translate(args: TranslateArgs) -> Result<()> {
    let scene = load_scene(&args.dump)?;

    let mut translations = serde_json::Map::new();
    match &args.material {
        Some(name) => {
            let material = scene
                .material(name)
                .with_context(|| format!("Material '{}' not found in {}", name, args.dump.display()))?;
            translations.insert(name.clone(), serde_json::to_value(translate_material(material))?);
        }
        None => {
            let mut names: Vec<_> = scene.materials().map(|m| m.name.clone()).collect();
            names.sort();
            for name in names {
                if let Some(material) = scene.material(&name) {
                    translations.insert(name, serde_json::to_value(translate_material(material))?);
                }
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&translations)?);
    Ok(())
}

fn cmd_import_plan(args: ImportPlanArgs, format: OutputFormat) -> Result<()> {
    let paths = AssetPaths::new(&args.project, &args.scene);
    let mut editor = InMemoryEditor::new();
    let report = SceneImporter::new(&mut editor, paths)
        .with_save_rate(args.save_rate)
        .import_from_project()
        .with_context(|| format!("Failed to import scene '{}'", args.scene))?;

    match format {
        OutputFormat::Json => {
            let plan = serde_json::json!({
                "entities": editor.entities(),
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        OutputFormat::Text => {
            for entity in editor.entities() {
                let parent = entity
                    .parent
                    .and_then(|id| editor.entity(id))
                    .map(|p| p.name.as_str())
                    .unwrap_or("-");
                let components: Vec<_> = entity.components.iter().map(|c| c.name()).collect();
                println!("{} (parent: {}) [{}]", entity.name, parent, components.join(", "));
                if let Some(mesh) = &entity.mesh_asset {
                    println!("  mesh: {}", mesh);
                }
                for (label, asset) in &entity.material_slots {
                    println!("  slot {}: {}", label, asset.as_deref().unwrap_or("-"));
                }
            }
            println!(
                "{} created, {} found, {} warnings",
                report.created.len(),
                report.found.len(),
                report.warnings.len()
            );
            for warning in &report.warnings {
                println!("WARNING: {}", warning);
            }
        }
    }
    Ok(())
}
