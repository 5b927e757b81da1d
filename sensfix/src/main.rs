use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::style::Stylize;

use aaf_core::cursor::ByteCursor;
use aaf_core::patch::patch_record;
use aaf_core::sens::SensRecord;
use aaf_core::{chunk, ibnk, sens};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// AAF file to scan; patched in place after confirmation.
    file: PathBuf,

    /// Patch without asking for confirmation.
    #[arg(long)]
    no_confirm: bool,

    /// Skip the AAF magic check and parse the file anyway.
    #[arg(long)]
    skip_aaf_check: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !args.file.exists() {
        bail!("'{}' does not exist or cannot be accessed", args.file.display());
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&args.file)
        .with_context(|| format!("open {}", args.file.display()))?;
    let mut cur = ByteCursor::new(file);

    if !args.skip_aaf_check && !aaf_core::check_magic(&mut cur)? {
        bail!(
            "invalid AAF, must be an unmodified Pikmin 2 AAF \
             (pass --skip-aaf-check to try it anyways)"
        );
    }

    println!("Reading {}", args.file.display());
    cur.seek(0)?;
    let ibnk_offsets = chunk::collect_ibnk_offsets(&mut cur)?;
    println!("{} IBNK found", ibnk_offsets.len());

    println!("Loading SENS objects...");
    let mut refs = Vec::new();
    for &offset in &ibnk_offsets {
        refs.extend(ibnk::collect_sens_refs(&mut cur, offset)?);
    }
    cur.clear_base();
    println!("{} SENS objects.", refs.len());

    let mut flagged = Vec::new();
    for r in refs {
        let rec = sens::inspect(&mut cur, r)?;
        print_report_row(&rec);
        if rec.corrupt {
            flagged.push(rec);
        }
    }

    if flagged.is_empty() {
        println!("Nothing to patch.");
        return Ok(());
    }
    log::debug!("{} corrupted SENS records", flagged.len());

    if !args.no_confirm && !confirm()? {
        return Ok(());
    }

    println!("Patching ibnks...");
    for rec in &flagged {
        let dump = patch_record(&mut cur, rec.addr)
            .with_context(|| format!("patch SENS record at {:#x}", rec.addr))?;
        print_patched_row(rec.addr, &dump);
    }
    println!("done.");
    Ok(())
}

fn print_report_row(rec: &SensRecord) {
    let mut row = format!("{:04X}: ", rec.addr);
    for b in rec.bytes {
        row.push_str(&format!("{:02X} ", b));
    }
    row.push_str(&format!("| {}, {}", rec.floor, rec.ceil));
    if rec.corrupt {
        println!("{}", row.red());
    } else {
        println!("{}", row);
    }
}

fn print_patched_row(addr: u64, dump: &[u8]) {
    print!("{:04X}: ", addr);
    for (i, b) in dump.iter().enumerate() {
        let pair = format!("{:02X} ", b);
        if (4..12).contains(&i) {
            print!("{}", pair.green());
        } else {
            print!("{}", pair);
        }
    }
    println!("|");
}

/// Ask before mutating the file. `Y` proceeds, `N` declines, anything else
/// asks again.
fn confirm() -> Result<bool> {
    let stdin = io::stdin();
    loop {
        print!(
            "I will correct the items above, this will make permanent changes to your AAF.\n\
             Press Y to continue, N to cancel.: "
        );
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim() {
            "y" | "Y" => return Ok(true),
            "n" | "N" => return Ok(false),
            _ => println!("Invalid choice. Let me ask again:"),
        }
    }
}
