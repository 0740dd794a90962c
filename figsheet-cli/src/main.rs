//! figsheet command-line interface.
//!
//! Groups image files, builds and processes tables, exports group sheets and
//! generates report figures without the GUI.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use figsheet_core::{
    process_table, Colormap, Column, FigureSelection, FileImporter, GroupRule, Grouping,
    GroupingConfig, ReportSelection, Table,
};
use figsheet_io::{load_record, load_table, save_table, FigsheetConfig, FixedDirectory};
use figsheet_render::{
    default_export_dir, export_sheets, generate_report, regenerate_report, ExportOptions,
    ReportOptions, SheetStyle,
};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    FigsheetIo(#[from] figsheet_io::Error),

    #[error("{0}")]
    Core(#[from] figsheet_core::Error),

    #[error("Render error: {0}")]
    Render(#[from] figsheet_render::Error),

    #[error("{0}")]
    Usage(String),
}

/// Group, threshold and compose microscopy figure sheets.
#[derive(Parser)]
#[command(name = "figsheet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Grouping rule flags. Without either flag the configured rule is used.
#[derive(Args, Debug, Clone, Default)]
struct RuleArgs {
    /// Group by underscore segments START:END (0-based, end exclusive)
    #[arg(long, value_name = "START:END", conflicts_with = "chars")]
    underscore: Option<String>,

    /// Group by characters FROM:TO (1-based, inclusive)
    #[arg(long, value_name = "FROM:TO")]
    chars: Option<String>,
}

impl RuleArgs {
    fn grouping(&self, config: &FigsheetConfig) -> Result<GroupingConfig> {
        if let Some(range) = &self.underscore {
            let (start, end) = GroupRule::parse_range(range)?;
            return Ok(GroupingConfig::with_rule(GroupRule::Underscore { start, end }));
        }
        if let Some(range) = &self.chars {
            let (from, to) = GroupRule::parse_range(range)?;
            return Ok(GroupingConfig::with_rule(GroupRule::from_one_based_chars(
                from, to,
            )?));
        }
        Ok(config.grouping)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Preview how files would be grouped
    Group {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        rule: RuleArgs,
    },

    /// Create, inspect and sort tables
    Table {
        #[command(subcommand)]
        command: TableCommands,
    },

    /// Threshold every image of a table and store the fractions
    Process {
        /// Table file
        table: PathBuf,

        /// Intensity threshold
        #[arg(short, long)]
        threshold: f64,

        /// Directory to use when the table has none
        #[arg(long)]
        directory: Option<PathBuf>,
    },

    /// Export group sheets as PNG, SVG and a combined PDF
    Export {
        /// Table file
        table: PathBuf,

        /// Groups to export (default: all)
        #[arg(short, long = "group")]
        groups: Vec<String>,

        /// Output directory (default: figures/ next to the table)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Logarithmic histogram y-axis
        #[arg(long)]
        log_scale: bool,

        /// Normalize each histogram to its peak
        #[arg(long)]
        normalize: bool,

        /// PNG resolution
        #[arg(long)]
        dpi: Option<u32>,

        /// Heatmap colormap
        #[arg(long)]
        colormap: Option<Colormap>,

        /// Skip SVG output
        #[arg(long)]
        no_svg: bool,
    },

    /// Build or regenerate report figures
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
enum TableCommands {
    /// Build a table from image files
    New {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output table file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        rule: RuleArgs,

        /// Sort rows by group ID before saving
        #[arg(long)]
        sort_by_groups: bool,
    },

    /// Print a table
    Show {
        table: PathBuf,

        /// Directory to use when the table has none
        #[arg(long)]
        directory: Option<PathBuf>,
    },

    /// Sort a table in place
    Sort {
        table: PathBuf,

        #[arg(long, value_enum, default_value = "groups")]
        by: SortKey,

        /// Directory to use when the table has none
        #[arg(long)]
        directory: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortKey {
    /// Group ID, then filename
    Groups,
    /// Filename only
    Filename,
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Auto-select files per row and write the report
    New {
        /// Figure name (repeat for each figure)
        #[arg(long = "figure", required = true)]
        figures: Vec<String>,

        /// Source table of the figure at the same position
        #[arg(long = "table", required = true)]
        tables: Vec<PathBuf>,

        /// Comma-separated groups for the rows of the figure at the same
        /// position, in row order
        #[arg(long = "groups", required = true)]
        groups: Vec<String>,

        /// Output directory (default: figures/ next to the first table)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-render a saved selection next to the selection file
    Regen {
        /// figure_selections.json
        selection: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn collect_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut importer = FileImporter::new();
    for input in inputs {
        let added = importer.add_path(input)?;
        log::debug!("{}: {} files", input.display(), added);
    }
    if importer.is_empty() {
        return Err(CliError::Usage("no supported image files found".into()));
    }
    Ok(importer.into_files())
}

fn open_table(path: &Path, directory: Option<PathBuf>) -> Result<Table> {
    Ok(load_table(path, &mut FixedDirectory(directory))?)
}

fn print_table(table: &Table) {
    let columns = table.columns();
    let header: Vec<&str> = columns.iter().map(|c| c.name()).collect();
    println!("{}", header.join("\t"));
    for row in table.rows() {
        let cells: Vec<String> = columns.iter().map(|c| row.cell(*c)).collect();
        println!("{}", cells.join("\t"));
    }
    println!();
    println!("{} rows", table.len());
    if table.has_column(Column::Group) {
        for group in table.groups() {
            println!("  {:<30} {:>4} files", group.label(), group.count);
        }
    }
}

/// Pair each figure with its table and row groups.
fn figure_specs(
    figures: &[String],
    tables: &[PathBuf],
    groups: &[String],
    row_labels: &[String],
) -> Result<Vec<(String, PathBuf, Vec<(String, String)>)>> {
    if figures.len() != tables.len() || figures.len() != groups.len() {
        return Err(CliError::Usage(format!(
            "--figure, --table and --groups must be given the same number of times ({}, {}, {})",
            figures.len(),
            tables.len(),
            groups.len()
        )));
    }
    figures
        .iter()
        .zip(tables)
        .zip(groups)
        .map(|((name, table), list)| {
            let names: Vec<&str> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if names.len() > row_labels.len() {
                return Err(CliError::Usage(format!(
                    "{name}: {} groups given but the layout has {} rows",
                    names.len(),
                    row_labels.len()
                )));
            }
            let rows = row_labels
                .iter()
                .zip(names)
                .map(|(label, group)| (label.clone(), group.to_string()))
                .collect();
            Ok((name.clone(), table.clone(), rows))
        })
        .collect()
}

fn print_outputs(written: &[PathBuf], failures: &[(String, String)]) {
    for path in written {
        println!("  wrote {}", path.display());
    }
    if !failures.is_empty() {
        eprintln!("{} item(s) failed:", failures.len());
        for (item, err) in failures {
            eprintln!("  {}: {}", item, err);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => FigsheetConfig::from_file(path)?,
        None => FigsheetConfig::default(),
    };

    match cli.command {
        Commands::Group { inputs, rule } => {
            let files = collect_files(&inputs)?;
            let grouping = Grouping::build(&files, &rule.grouping(&config)?);
            for (key, members) in grouping.groups() {
                println!("{} ({} files)", key, members.len());
                for path in members {
                    let name = path.file_name().map(|n| n.to_string_lossy());
                    println!("    {}", name.unwrap_or_default());
                }
            }
            let preview = grouping.preview();
            println!(
                "{} groups, {} ungrouped, {} files total",
                preview.group_count,
                preview.ungrouped_count,
                grouping.total_files()
            );
        }

        Commands::Table { command } => match command {
            TableCommands::New {
                inputs,
                output,
                rule,
                sort_by_groups,
            } => {
                let files = collect_files(&inputs)?;
                let grouping = Grouping::build(&files, &rule.grouping(&config)?);
                let mut table = Table::from_grouping(&grouping)?;
                if sort_by_groups {
                    table.sort_by_groups();
                }
                save_table(&output, &table)?;
                println!(
                    "Saved {} rows in {} groups to {}",
                    table.len(),
                    table.groups().len(),
                    output.display()
                );
            }
            TableCommands::Show { table, directory } => {
                print_table(&open_table(&table, directory)?);
            }
            TableCommands::Sort {
                table: path,
                by,
                directory,
            } => {
                let mut table = open_table(&path, directory)?;
                match by {
                    SortKey::Groups => table.sort_by_groups(),
                    SortKey::Filename => table.sort_by_filename(),
                }
                save_table(&path, &table)?;
                println!("Sorted {} rows by {:?}", table.len(), by);
            }
        },

        Commands::Process {
            table: path,
            threshold,
            directory,
        } => {
            if !threshold.is_finite() {
                return Err(CliError::Usage("threshold must be a finite number".into()));
            }
            let mut table = open_table(&path, directory)?;
            let cancel = AtomicBool::new(false);
            let report = process_table(&mut table, threshold, load_record, &cancel)?;
            save_table(&path, &table)?;
            println!(
                "Processed {} of {} rows at threshold {}",
                report.processed,
                table.len(),
                threshold
            );
            print_outputs(&[], &report.failures);
        }

        Commands::Export {
            table: path,
            groups,
            output,
            log_scale,
            normalize,
            dpi,
            colormap,
            no_svg,
        } => {
            let table = open_table(&path, None)?;
            let groups = if groups.is_empty() {
                table.groups().into_iter().map(|g| g.name).collect()
            } else {
                groups
            };
            let mut options =
                ExportOptions::new(output.unwrap_or_else(|| default_export_dir(&path)));
            options.dpi = f64::from(dpi.unwrap_or(config.export_dpi));
            options.write_svg = !no_svg;
            options.display.log_scale = log_scale;
            options.display.normalize = normalize;
            options.style = SheetStyle {
                colormap: colormap.unwrap_or(config.colormap),
                max_cells: config.heatmap_max_cells,
                ..SheetStyle::default()
            };
            let cancel = AtomicBool::new(false);
            let report = export_sheets(&table, &groups, &options, &cancel)?;
            println!(
                "Exported {} groups to {}{}",
                groups.len(),
                options.out_dir.display(),
                if report.cancelled { " (cancelled)" } else { "" }
            );
            print_outputs(&report.written, &report.failures);
        }

        Commands::Report { command } => {
            let options = ReportOptions {
                png_dpi: f64::from(config.export_dpi),
                style: SheetStyle {
                    colormap: config.colormap,
                    max_cells: config.heatmap_max_cells,
                    ..SheetStyle::default()
                },
                ..ReportOptions::default()
            };
            match command {
                ReportCommands::New {
                    figures,
                    tables,
                    groups,
                    output,
                } => {
                    let layout = config.report.clone();
                    let specs = figure_specs(&figures, &tables, &groups, &layout.row_labels)?;
                    let mut selection = ReportSelection {
                        layout: layout.clone(),
                        figures: Vec::with_capacity(specs.len()),
                    };
                    for (i, (name, table_path, rows)) in specs.into_iter().enumerate() {
                        let table = open_table(&table_path, None)?;
                        let (figure, missing) = FigureSelection::auto(
                            &format!("fig{}", i + 1),
                            &name,
                            &table,
                            table_path.clone(),
                            &rows,
                            &layout,
                        )?;
                        for (row, timepoints) in missing {
                            eprintln!("{} / {}: no file for {}", name, row, timepoints.join(", "));
                        }
                        selection.figures.push(figure);
                    }
                    let out_dir = output.unwrap_or_else(|| default_export_dir(&tables[0]));
                    let result = generate_report(&selection, &out_dir, true, &options)?;
                    println!(
                        "Generated {} figures in {}",
                        selection.figures.len(),
                        out_dir.display()
                    );
                    print_outputs(&result.written, &result.failures);
                }
                ReportCommands::Regen { selection } => {
                    let result = regenerate_report(&selection, &options)?;
                    print_outputs(&result.written, &result.failures);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_rule_flags() {
        let config = FigsheetConfig::default();
        let rule = RuleArgs {
            underscore: Some("0:2".into()),
            chars: None,
        };
        assert_eq!(
            rule.grouping(&config).unwrap().rule,
            GroupRule::Underscore { start: 0, end: 2 }
        );
        let rule = RuleArgs {
            underscore: None,
            chars: Some("1:6".into()),
        };
        assert_eq!(
            rule.grouping(&config).unwrap().rule,
            GroupRule::Characters { start: 0, end: 6 }
        );
        assert_eq!(
            RuleArgs::default().grouping(&config).unwrap(),
            config.grouping
        );
    }

    #[test]
    fn test_figure_specs_pair_rows_in_order() {
        let labels: Vec<String> = ["Ctrl #1", "Ctrl #2", "TNFa #1"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let specs = figure_specs(
            &["Lemon".into()],
            &[PathBuf::from("t.json")],
            &["ctrl, ctrlb".into()],
            &labels,
        )
        .unwrap();
        assert_eq!(
            specs[0].2,
            vec![
                ("Ctrl #1".to_string(), "ctrl".to_string()),
                ("Ctrl #2".to_string(), "ctrlb".to_string())
            ]
        );
        assert!(figure_specs(&["A".into()], &[], &[], &labels).is_err());
        assert!(figure_specs(
            &["A".into()],
            &[PathBuf::from("t.json")],
            &["a,b,c,d".into()],
            &labels
        )
        .is_err());
    }

    #[test]
    fn test_parse_report_new() {
        let cli = Cli::try_parse_from([
            "figsheet", "report", "new", "--figure", "Lemon", "--table", "a.json", "--groups",
            "ctrl,tnf", "--figure", "Lychee", "--table", "b.json", "--groups", "lif",
        ])
        .unwrap();
        let Commands::Report {
            command: ReportCommands::New { figures, tables, .. },
        } = cli.command
        else {
            panic!("expected report new");
        };
        assert_eq!(figures, vec!["Lemon", "Lychee"]);
        assert_eq!(tables.len(), 2);
    }
}
