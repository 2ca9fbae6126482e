//! tcrhla: HLA genotype inference from bulk TCR repertoires
//!
//! ```bash
//! # hits matrix of the HLA-associated TCRs in every .tsv file of a folder
//! tcrhla tabulate --reference data/HLA_associated_TCRs.tsv --resources samples/ \
//!     --strip-str .tsv --cols-to-match v_b_gene,cdr3_b_aa --cols-to-family v_b_gene \
//!     --outfile hits.tsv
//!
//! # genotype calls for one locus
//! tcrhla predict --input hits.tsv --locus HLA-A --threshold 0.1 --use-detects --outfile calls.tsv
//! ```
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tcrhla::predict::{sweep, weight_of_evidence};
use tcrhla::shared::parameters::parse_delimiter;
use tcrhla::shared::utils::{discover_samples, resolve_samples, split_list};
use tcrhla::shared::{parser, ConfigurationError, TranslationTable};
use tcrhla::tabulate::reformat::reformat_export;
use tcrhla::{
    tabulate_cohort, CohortOptions, EvidenceMethod, Locus, MatchParameters, SampleInput,
    Threshold,
};

#[derive(Parser)]
#[command(name = "tcrhla", about = "HLA genotype inference from bulk TCR repertoires")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count the HLA-associated reference clonotypes in every sample (hits matrix)
    Tabulate(TabulateArgs),
    /// Weight of evidence per allele and top-2 genotype call per sample
    Predict(PredictArgs),
    /// Sensitivity/specificity of the calls against known genotypes
    Evaluate(EvaluateArgs),
    /// Convert a vendor repertoire export to the standard sample columns
    Reformat(ReformatArgs),
}

#[derive(Args)]
struct TabulateArgs {
    /// File containing HLA-diagnostic TCRs (columns `tcr` and `hla_allele`)
    #[arg(long)]
    reference: PathBuf,
    /// Folder containing the sample files
    #[arg(long)]
    resources: PathBuf,
    /// Where to write the hits matrix
    #[arg(long)]
    outfile: PathBuf,
    /// Comma separated list of files of <resources> to run (default: all of them)
    #[arg(long)]
    filenames: Option<String>,
    /// Removed from the end of the file names to get the sample names
    #[arg(long, default_value = "")]
    strip_str: String,
    /// Suffix of the files of <resources> considered
    #[arg(long, default_value = ".tsv")]
    endswith_str: String,
    /// Field delimiter of the input files
    #[arg(long, default_value = "\t")]
    sep: String,
    /// String joining the matched columns (e.g. `,` for V06,CASSPGPDRYEQYF)
    #[arg(long, default_value = ",")]
    sep_str: String,
    /// Comma separated columns forming the matching string
    #[arg(long, default_value = "v_b_gene,cdr3_b_aa")]
    cols_to_match: String,
    /// Comma separated columns converted from gene to family (TRBV12*01 -> V12)
    #[arg(long, default_value = "v_b_gene")]
    cols_to_family: String,
    /// Abundance column (count, templates...)
    #[arg(long, default_value = "count")]
    col_to_count: String,
    /// JSON file with the matching parameters (replaces the column/separator options)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of samples tabulated in parallel
    #[arg(long, default_value_t = 2)]
    ncpus: usize,
    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args)]
struct ScoringArgs {
    /// Hits matrix produced by `tabulate`
    #[arg(long)]
    input: PathBuf,
    /// HLA-A, HLA-B or HLA-C
    #[arg(long)]
    locus: String,
    /// Weight the detections (number of diagnostic TCRs seen)
    #[arg(long)]
    use_detects: bool,
    /// Weight the counts (summed abundance of diagnostic TCRs)
    #[arg(long)]
    use_counts: bool,
}

#[derive(Args)]
struct PredictArgs {
    #[command(flatten)]
    scoring: ScoringArgs,
    /// Minimal weight to call an allele, in [0, 1]
    #[arg(long)]
    threshold: f64,
    /// Where to write the predictions
    #[arg(long)]
    outfile: PathBuf,
    /// Also write the per (allele, sample) evidence table
    #[arg(long)]
    evidence_out: Option<PathBuf>,
}

#[derive(Args)]
struct EvaluateArgs {
    #[command(flatten)]
    scoring: ScoringArgs,
    /// Comma separated thresholds
    #[arg(long, default_value = "0.01,0.05,0.1,0.15,0.2,0.25,0.3,0.35,0.4,0.45,0.5")]
    thresholds: String,
    /// Tab separated table with a `sample` column and the known genotypes
    #[arg(long)]
    truth: PathBuf,
    /// Genotype column of the truth table (default: hla_a, hla_b or hla_c)
    #[arg(long)]
    truth_col: Option<String>,
    /// Comma separated alleles to evaluate (default: all alleles of the locus)
    #[arg(long)]
    alleles: Option<String>,
    /// Where to write the per-allele summary
    #[arg(long)]
    outfile: PathBuf,
    /// Also write the per (sample, allele) comparisons
    #[arg(long)]
    granular_out: Option<PathBuf>,
}

#[derive(Args)]
struct ReformatArgs {
    /// Vendor export
    #[arg(long)]
    input: PathBuf,
    /// Standard tab separated sample file to write
    #[arg(long)]
    output: PathBuf,
    /// Two columns table (vendor name, standard name) of gene names
    #[arg(long)]
    gene_table: PathBuf,
    /// Field delimiter of the export
    #[arg(long, default_value = ",")]
    sep: String,
    /// Subject name (default: name of the export file)
    #[arg(long)]
    subject: Option<String>,
}

fn check_input(path: &Path) -> Result<(), ConfigurationError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigurationError::MissingInput(path.to_path_buf()))
    }
}

fn run_tabulate(args: TabulateArgs) -> Result<()> {
    let params = match &args.config {
        Some(path) => MatchParameters::load_json(path)?,
        None => MatchParameters::new(
            &args.sep,
            &args.sep_str,
            split_list(&args.cols_to_match),
            split_list(&args.cols_to_family),
            &args.col_to_count,
        )?,
    };
    check_input(&args.reference)?;
    let files = match &args.filenames {
        Some(names) => resolve_samples(&args.resources, &split_list(names))?,
        None => discover_samples(&args.resources, &args.endswith_str)?,
    };
    info!("Running exact match with {} valid files", files.len());

    let panel = parser::read_reference_panel(&args.reference, params.delimiter()?)?;
    let samples: Vec<SampleInput> = files
        .iter()
        .map(|f| SampleInput::from_path(f, &args.strip_str))
        .collect();
    let options = CohortOptions {
        threads: args.ncpus,
        show_progress: !args.no_progress,
        ..Default::default()
    };
    let cohort = tabulate_cohort(&samples, &panel, &params, &options)?;

    info!("Writing {}", args.outfile.display());
    parser::write_hits_matrix(BufWriter::new(File::create(&args.outfile)?), &cohort.matrix)?;
    Ok(())
}

fn scoring_config(args: &ScoringArgs) -> Result<(Locus, EvidenceMethod)> {
    let locus: Locus = args.locus.parse()?;
    let method = EvidenceMethod::from_flags(args.use_detects, args.use_counts)?;
    Ok((locus, method))
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let (locus, method) = scoring_config(&args.scoring)?;
    Threshold::new(args.threshold)?;
    check_input(&args.scoring.input)?;

    let matrix = parser::read_hits_matrix(&args.scoring.input)?;
    let (table, predictions) = weight_of_evidence(&matrix, locus, args.threshold, method)?;
    if let Some(path) = &args.evidence_out {
        parser::write_evidence(BufWriter::new(File::create(path)?), &table)?;
    }
    info!("Writing {}", args.outfile.display());
    parser::write_predictions(
        BufWriter::new(File::create(&args.outfile)?),
        &predictions,
        &table.alleles,
    )?;
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let (locus, method) = scoring_config(&args.scoring)?;
    let thresholds = split_list(&args.thresholds)
        .iter()
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| anyhow!("Invalid threshold '{}'", t))
                .and_then(|x| Ok(Threshold::new(x)?.value()))
        })
        .collect::<Result<Vec<f64>>>()?;
    check_input(&args.scoring.input)?;
    check_input(&args.truth)?;

    let truth_col = args
        .truth_col
        .clone()
        .unwrap_or_else(|| locus.truth_column().to_string());
    let truth = parser::read_truth_table(&args.truth, &truth_col)?;
    let matrix = parser::read_hits_matrix(&args.scoring.input)?;
    let table = tcrhla::score(&matrix, locus, method)?;
    let alleles = args.alleles.as_deref().map(split_list);
    let (performances, outcomes) = sweep(&table, &thresholds, &truth, alleles.as_deref())?;

    info!("Writing {}", args.outfile.display());
    parser::write_performance(BufWriter::new(File::create(&args.outfile)?), &performances)?;
    if let Some(path) = &args.granular_out {
        parser::write_outcomes(BufWriter::new(File::create(path)?), &outcomes)?;
    }
    Ok(())
}

fn run_reformat(args: ReformatArgs) -> Result<()> {
    let delimiter = parse_delimiter(&args.sep)?;
    check_input(&args.input)?;
    check_input(&args.gene_table)?;
    let lookup = TranslationTable::load(&args.gene_table, b'\t')?;
    let subject = args.subject.clone().unwrap_or_else(|| {
        args.input
            .file_name()
            .map_or(String::new(), |f| f.to_string_lossy().to_string())
    });
    reformat_export(&args.input, &args.output, delimiter, &subject, &lookup)?;
    Ok(())
}

impl Command {
    fn run(self) -> Result<()> {
        match self {
            Command::Tabulate(args) => run_tabulate(args),
            Command::Predict(args) => run_predict(args),
            Command::Evaluate(args) => run_evaluate(args),
            Command::Reformat(args) => run_reformat(args),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = Cli::parse().command.run() {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
