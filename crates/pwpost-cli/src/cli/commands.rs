use super::CliError;
use super::helpers::{
    emit, field_statistics, header_lines, parse_spin_component, pseudo_summary_json,
    pseudo_summary_lines,
};
use pwpost_core::config::load_field_metadata;
use pwpost_core::container::open_hdf5_container;
use pwpost_core::domain::SpinComponent;
use pwpost_core::modules::charge::{DuplicateMillerPolicy, read_charge_density_with_policy};
use pwpost_core::modules::dump::{read_field_dump, write_field_dump};
use pwpost_core::modules::pseudo::read_pseudo_file;
use pwpost_core::modules::series::{minimum, read_series};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct ChargeArgs {
    /// Charge-density container written by the calculation (HDF5)
    #[arg(long)]
    charge_file: PathBuf,

    /// JSON metadata with grid, cell and atomic positions
    #[arg(long)]
    metadata: PathBuf,

    /// Field dump output path
    #[arg(long, default_value = "charge.dat")]
    output: PathBuf,

    /// Spin component to write: total, up or down
    #[arg(long, default_value = "total", value_parser = parse_spin_component)]
    spin: SpinComponent,

    /// Let later coefficients overwrite earlier ones on repeated Miller indices
    #[arg(long)]
    allow_duplicates: bool,
}

#[derive(clap::Args)]
pub(super) struct PseudoArgs {
    /// Pseudopotential file (UPF)
    file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct DumpArgs {
    /// Field dump file
    file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct SeriesArgs {
    /// Two-column series file
    file: PathBuf,

    /// Print the series as JSON
    #[arg(long)]
    json: bool,
}

pub(super) fn run_charge_command(args: ChargeArgs) -> Result<i32, CliError> {
    let metadata =
        load_field_metadata(&args.metadata).map_err(|error| CliError::Compute(error.into()))?;
    let shape = metadata.grid_shape()?;
    let header = metadata.file_header()?;
    let policy = if args.allow_duplicates {
        DuplicateMillerPolicy::LastWriteWins
    } else {
        DuplicateMillerPolicy::Reject
    };

    info!(
        charge_file = %args.charge_file.display(),
        grid = %shape,
        spin = args.spin.as_str(),
        ?policy,
        "reconstructing charge density"
    );
    let container = open_hdf5_container(&args.charge_file)?;
    let charge = read_charge_density_with_policy(&container, shape, policy)?;
    let field = charge.component(args.spin);
    write_field_dump(&args.output, &header, &field)?;

    let statistics = field_statistics(&field);
    println!(
        "{} charge ({}) on grid {} written to {}",
        args.spin.as_str(),
        if charge.is_magnetic() { "magnetic" } else { "non-magnetic" },
        shape,
        args.output.display()
    );
    println!("{}", statistics.render());
    Ok(0)
}

pub(super) fn run_pseudo_command(args: PseudoArgs) -> Result<i32, CliError> {
    let pseudo = read_pseudo_file(&args.file)?;
    if args.json {
        emit(&pseudo_summary_json(&pseudo))?;
    } else {
        for line in pseudo_summary_lines(&pseudo) {
            println!("{line}");
        }
    }
    Ok(0)
}

pub(super) fn run_dump_command(args: DumpArgs) -> Result<i32, CliError> {
    let dump = read_field_dump(&args.file)?;
    let statistics = field_statistics(&dump.field);
    if args.json {
        emit(&json!({
            "prefix": dump.header.prefix,
            "grid": dump.header.grid,
            "smoothGrid": dump.header.smooth_grid,
            "ibrav": dump.header.ibrav,
            "celldm": dump.header.celldm,
            "species": dump.header.species,
            "nat": dump.header.nat(),
            "statistics": statistics.to_json(),
        }))?;
    } else {
        for line in header_lines(&dump.header) {
            println!("{line}");
        }
        println!("{}", statistics.render());
    }
    Ok(0)
}

pub(super) fn run_series_command(args: SeriesArgs) -> Result<i32, CliError> {
    let series = read_series(&args.file)?;
    let lowest = minimum(&series);
    if args.json {
        emit(&json!({
            "points": series.iter().map(|(x, y)| [x, y]).collect::<Vec<_>>(),
            "minimum": lowest.map(|(x, y)| [x, y]),
        }))?;
    } else {
        for (x, y) in &series {
            println!("{x:>16.8} {y:>20.10}");
        }
        match lowest {
            Some((x, y)) => println!("minimum at x = {x} (y = {y})"),
            None => println!("series is empty"),
        }
    }
    Ok(0)
}
