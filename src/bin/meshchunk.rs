//! `meshchunk` - inspect and manage saved mesh chunks.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use glam::Vec3;

use spatial_mesh_serializer::generators::generate_grid;
use spatial_mesh_serializer::{
    Aabb, MeshHandle, MeshInstantiator, MeshSerializer, Pose, SerializerError, SerializerResult,
    SpaceContext, StoreError, decode_chunk, instantiate, load_or_default,
};

#[derive(Parser, Debug)]
#[command(
    name = "meshchunk",
    about = "Inspect and manage saved spatial mesh chunks",
    long_about = "Inspect and manage spatial mesh chunks saved as \
        <root>/<meshes_dir>/<space-id>/chunk-<n>.bin.\n\n\
        EXAMPLES:\n\
          # Decode a single chunk file\n\
          meshchunk inspect meshes/kitchen/chunk-0.bin\n\
        \n\
          # Save and reload generated meshes\n\
          meshchunk --root /tmp/scan demo kitchen --meshes 4",
    version
)]
struct Cli {
    /// Serializer config file.
    #[arg(long, default_value = "meshchunk.toml")]
    config: PathBuf,

    /// Override the application data root from the config.
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode one chunk file and print its header, pose and bounds.
    Inspect { file: PathBuf },
    /// List saved spaces, or the chunks of one space.
    List { space: Option<String> },
    /// Delete every chunk saved for a space.
    Delete { space: String },
    /// Generate grid meshes, save them to a space, reload and place them.
    Demo {
        space: String,
        /// Number of meshes to generate.
        #[arg(long, default_value = "3")]
        meshes: u32,
        /// Grid cells per side of each mesh.
        #[arg(long, default_value = "16")]
        cells: u32,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> SerializerResult<()> {
    if let Command::Inspect { file } = &cli.command {
        return inspect(file);
    }

    let mut config = load_or_default(&cli.config);
    if let Some(root) = cli.root {
        config.root = root;
    }
    let serializer = MeshSerializer::from_config(&config)?;
    let runner = serializer.runner().clone();

    match cli.command {
        Command::Inspect { .. } => Ok(()),
        Command::List { space: None } => {
            for space in runner.block_on(serializer.list_spaces())? {
                println!("{space}");
            }
            Ok(())
        }
        Command::List { space: Some(space) } => {
            match runner.block_on(serializer.load(&space))? {
                None => println!("{space}: no saved meshes"),
                Some(report) => {
                    for mesh in &report.meshes {
                        print_mesh(mesh);
                    }
                    for failure in &report.failures {
                        println!("{}: FAILED {}", failure.chunk, failure.error);
                    }
                }
            }
            Ok(())
        }
        Command::Delete { space } => runner.block_on(serializer.delete(&space)),
        Command::Demo {
            space,
            meshes,
            cells,
        } => demo(&serializer, &space, meshes, cells),
    }
}

fn inspect(file: &Path) -> SerializerResult<()> {
    let bytes = std::fs::read(file).map_err(|e| SerializerError::Io {
        path: file.display().to_string(),
        source: StoreError::from(e),
    })?;
    let chunk_id = file
        .file_stem()
        .map_or_else(|| "chunk".into(), |s| s.to_string_lossy().into_owned());
    let decoded =
        decode_chunk(&bytes).map_err(|e| SerializerError::MalformedChunk {
            chunk: chunk_id.clone(),
            source: e,
        })?;
    println!("{} ({} bytes)", file.display(), bytes.len());
    print_mesh(&MeshHandle::from_decoded(chunk_id, decoded));
    Ok(())
}

fn print_mesh(mesh: &MeshHandle) {
    let pose = mesh.pose();
    println!(
        "{}: {} vertices, {} indices, position {:?}, rotation {:?}",
        mesh.chunk_id(),
        mesh.vertex_count(),
        mesh.index_count(),
        pose.position.to_array(),
        pose.rotation.to_array(),
    );
    if let Some(bounds) = mesh.bounds() {
        println!(
            "  bounds min {:?} max {:?}",
            bounds.min.to_array(),
            bounds.max.to_array()
        );
    }
}

/// Prints each placed mesh and accumulates world-space bounds.
struct BoundsInstantiator {
    world: Option<Aabb>,
}

impl MeshInstantiator for BoundsInstantiator {
    type Object = String;

    fn instantiate(&mut self, mesh: MeshHandle, world_pose: Pose) -> String {
        if let Some(local) = mesh.bounds() {
            let placed = local.transformed(&world_pose);
            self.world = Some(match self.world {
                Some(world) => world.union(&placed),
                None => placed,
            });
        }
        format!("{} at {:?}", mesh.chunk_id(), world_pose.position.to_array())
    }
}

fn demo(serializer: &MeshSerializer, space: &str, meshes: u32, cells: u32) -> SerializerResult<()> {
    let runner = serializer.runner();
    let sources: Vec<_> = (0..meshes)
        .map(|i| generate_grid(cells, 0.1, [i as f32 * cells as f32 * 0.1, 0.0, 0.0]))
        .collect();

    let origin = Pose::from_translation(Vec3::new(0.0, 0.0, -1.0));
    let context = SpaceContext::localized(space, origin);

    let report = runner.block_on(serializer.save_current(&sources, &Pose::IDENTITY, &context))?;
    println!(
        "saved {} chunk(s) to space {}{}",
        report.written.len(),
        report.space_id,
        if report.is_success() { "" } else { " (with failures)" }
    );

    let Some(loaded) = runner.block_on(serializer.load_current(&context))? else {
        println!("nothing loaded");
        return Ok(());
    };
    if !loaded.is_complete() {
        println!("{} chunk(s) failed to load", loaded.failures.len());
    }

    let mut placer = BoundsInstantiator { world: None };
    for line in instantiate(loaded.into_meshes(), &mut placer, &context) {
        println!("placed {line}");
    }
    if let Some(world) = placer.world {
        println!(
            "world bounds center {:?} size {:?}",
            world.center().to_array(),
            world.size().to_array()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("meshchunk_inspect_missing.bin");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            inspect(&path),
            Err(SerializerError::Io {
                source: StoreError::NotFound(_),
                ..
            })
        ));
    }

    #[test]
    fn placed_bounds_follow_rotation() {
        let grid = generate_grid(1, 2.0, [-1.0, 0.0, -1.0]);
        let chunk = spatial_mesh_serializer::encode_mesh(&grid, &Pose::IDENTITY);
        let mesh = MeshHandle::from_decoded("chunk-0", decode_chunk(chunk.as_bytes()).unwrap());
        let pose = Pose::new(
            Vec3::ZERO,
            glam::Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        );
        let mut placer = BoundsInstantiator { world: None };
        placer.instantiate(mesh, pose);

        let world = placer.world.unwrap();
        assert!((world.max.x - 2.0f32.sqrt()).abs() < 1e-5);
        assert!((world.max.z - 2.0f32.sqrt()).abs() < 1e-5);
    }
}
