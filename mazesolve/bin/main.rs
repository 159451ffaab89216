use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use log::info;
use serde::Serialize;

use mazesolve::{
    entrance::Endpoints, error::SolveFailure, grid::Point, segment::RenderRegion,
    util::grid_to_image, CancelToken, MazeSolver, OccupancyGrid, Point2D, SolverConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "mazesolve",
    about = "Solve a photographed maze and draw the route onto the photo",
    version
)]
struct Cli {
    /// Photo of the maze
    #[arg(required_unless_present = "dump_grid")]
    input: Option<PathBuf>,

    /// The four maze corners as x,y in any order
    #[arg(short, long = "corners", num_args = 4, value_name = "X,Y")]
    corners: Vec<Point2D>,

    /// Where to write the photo with the route drawn on it
    #[arg(short, long, default_value = "solved.png")]
    output: PathBuf,

    /// JSON file with solver settings, missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON report of the solve (or of why it failed)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Draw a text maze file (`#` wall, `.` path, `o` route) to --output and exit
    #[arg(long, conflicts_with = "report")]
    dump_grid: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Report<'a> {
    Solved {
        endpoints: Endpoints,
        path: &'a [Point],
        total_cost: usize,
        expanded: usize,
        region: RenderRegion,
    },
    Failed(&'a SolveFailure),
}

fn write_report(path: &Path, report: &Report) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if let Some(maze) = &cli.dump_grid {
        let text = std::fs::read_to_string(maze)
            .with_context(|| format!("reading {}", maze.display()))?;
        let grid: OccupancyGrid = text.parse()?;
        grid_to_image(&grid).save(&cli.output)?;
        println!("{}", grid);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => SolverConfig::load(path)?,
        None => SolverConfig::default(),
    };
    let solver = MazeSolver::new(config)?;

    let input = cli.input.context("no input photo given")?;
    let photo = image::open(&input)
        .with_context(|| format!("opening {}", input.display()))?
        .to_rgba8();
    let corners: [Point2D; 4] = cli
        .corners
        .as_slice()
        .try_into()
        .context("exactly four corners are needed")?;

    match solver.solve_async(photo, corners, CancelToken::new()).await {
        Ok(solution) => {
            solution.overlay.save(&cli.output)?;
            info!(
                "wrote {} ({} steps, cost {})",
                cli.output.display(),
                solution.path.len(),
                solution.total_cost
            );

            if let Some(path) = &cli.report {
                write_report(
                    path,
                    &Report::Solved {
                        endpoints: solution.endpoints,
                        path: &solution.path,
                        total_cost: solution.total_cost,
                        expanded: solution.expanded,
                        region: solution.region,
                    },
                )?;
            }
            Ok(())
        }
        Err(failure) => {
            if let Some(path) = &cli.report {
                write_report(path, &Report::Failed(&failure))?;
            }
            Err(anyhow::anyhow!("{}", failure))
        }
    }
}
