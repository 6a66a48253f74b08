use hitrate_scan::cli::{parse_cli, PlotArgs};
use hitrate_scan::error::PlotError;
use hitrate_scan::init_logger;
use hitrate_scan::render::Renderer;
use hitrate_scan::scenario::PlotStyle;
use hitrate_scan::table::JobTable;
use log::{error, info};
use std::path::Path;

fn run(args: PlotArgs) -> Result<(), PlotError> {
    let mut table = JobTable::from_csv_files(&args.simoutputs)?;
    info!("simulation task output traces:\n{}", table);

    table.derive_metrics()?;

    let style: PlotStyle = args.style.parse()?;
    let renderer = Renderer::new(style, &args.scenario, &args.file_suffix(), Path::new("."));
    let written = renderer.render_all(&table)?;
    info!("wrote {} plots", written.len());
    Ok(())
}

fn main() {
    let args = parse_cli();
    init_logger(args.verbose);
    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
