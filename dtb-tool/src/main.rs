use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use fdt_decode::{DeviceTree, FdtError, PropertyValue};
use log::{debug, error};

/// Inspect a device tree blob
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// dtb file path
    input: PathBuf,

    /// print the properties of the node at this path
    #[arg(short, long)]
    path: Option<String>,

    /// print the target of this alias
    #[arg(short, long)]
    alias: Option<String>,
}

#[derive(thiserror::Error, Debug)]
enum ToolError {
    #[error("{}: not a .dtb file", .0.display())]
    NotDtb(PathBuf),
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    Fdt(#[from] FdtError),
}

fn load_dtb(path: &Path) -> Result<DeviceTree, ToolError> {
    if path.extension().is_none_or(|ext| ext != "dtb") {
        return Err(ToolError::NotDtb(path.to_path_buf()));
    }

    let data = std::fs::read(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {}", data.len(), path.display());

    Ok(DeviceTree::from_bytes(data)?)
}

fn print_properties(fdt: &DeviceTree, path: &str) -> Result<(), ToolError> {
    let offset = fdt.path_offset(path)?;
    println!("{} ({}) {{", path, offset);
    for (name, value) in fdt.properties_of(offset)? {
        match value {
            PropertyValue::Flag(_) => println!("    {};", name),
            value => println!("    {} = {};", name, value),
        }
    }
    println!("}};");
    Ok(())
}

fn run(args: &Args) -> Result<(), ToolError> {
    let fdt = load_dtb(&args.input)?;

    if let Some(name) = &args.alias {
        println!("{}", fdt.alias(name).unwrap_or("<none>"));
    }

    if let Some(path) = &args.path {
        print_properties(&fdt, path)?;
    }

    if args.alias.is_none() && args.path.is_none() {
        let header = fdt.header();
        println!(
            "// magic {:#x}, version {} (last compatible {}), {} bytes",
            header.magic, header.version, header.last_comp_version, header.totalsize
        );
        print!("{}", fdt);
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("dtb-tool: {}", e);
            ExitCode::FAILURE
        }
    }
}
