use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use platter::FileSystem;
use std::path::PathBuf;
use tracing::trace;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create and format a new disk image
    Create {
        #[arg(index = 1)]
        image: PathBuf,
        #[arg(short = 'c', long)]
        capacity: u32,
        #[arg(short = 'b', long, default_value_t = 256)]
        block_size: u32,
    },
    /// Delete a disk image
    Delete {
        #[arg(index = 1)]
        image: PathBuf,
    },
    /// Load a host file into the image, creating or replacing the named file
    Load {
        #[arg(index = 1)]
        image: PathBuf,
        #[arg(index = 2)]
        host_file: PathBuf,
        /// Name inside the image; defaults to the host file's name
        #[arg(index = 3)]
        name: Option<String>,
    },
    /// Copy one internal file to another name
    Cp {
        #[arg(index = 1)]
        image: PathBuf,
        #[arg(index = 2)]
        src: String,
        #[arg(index = 3)]
        dst: String,
    },
    /// List the files in the image's root directory
    Ls {
        #[arg(index = 1)]
        image: PathBuf,
    },
    /// Print a file's content to stdout
    Cat {
        #[arg(index = 1)]
        image: PathBuf,
        #[arg(index = 2)]
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
    trace!("starting up platter cli");
    match cli.command {
        Command::Create {
            image,
            capacity,
            block_size,
        } => {
            FileSystem::create(&image, capacity, block_size)
                .wrap_err("failed to create disk image")?;
        }
        Command::Delete { image } => {
            FileSystem::delete(&image).wrap_err("failed to delete disk image")?;
        }
        Command::Load {
            image,
            host_file,
            name,
        } => {
            let name = match name {
                Some(name) => name,
                None => host_file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| eyre::eyre!("host path has no file name"))?,
            };
            let bytes = std::fs::read(&host_file)
                .wrap_err_with(|| format!("couldn't read host file {host_file:?}"))?;
            let mut fs = FileSystem::mount(&image).wrap_err("failed to mount disk image")?;
            fs.load_file(&name, &bytes).wrap_err("failed to load file")?;
            fs.unmount()?;
        }
        Command::Cp { image, src, dst } => {
            let mut fs = FileSystem::mount(&image).wrap_err("failed to mount disk image")?;
            fs.copy_file(&src, &dst).wrap_err("failed to copy file")?;
            fs.unmount()?;
        }
        Command::Ls { image } => {
            let fs = FileSystem::mount(&image).wrap_err("failed to mount disk image")?;
            println!("{:<20} {}", "Filename:", "Size (bytes)");
            for (name, size) in fs.list()? {
                println!("{name:<20} {size}");
            }
            fs.unmount()?;
        }
        Command::Cat { image, name } => {
            let fs = FileSystem::mount(&image).wrap_err("failed to mount disk image")?;
            let content = fs.read_file(&name).wrap_err("failed to read file")?;
            let mut stdout = std::io::stdout().lock();
            std::io::Write::write_all(&mut stdout, &content)?;
            fs.unmount()?;
        }
    }
    Ok(())
}
