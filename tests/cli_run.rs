use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// Three 2 kb contigs with a GATC every 200 bp. Ten Hi-C pairs join the end of
// c1 to the begin of c2; c3 only has a cis pair.
fn fixture(dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let filler = "ACGTTGCA".repeat(25);
    let mut contig = String::new();
    while contig.len() < 2000 {
        contig.push_str("GATC");
        contig.push_str(&filler[..196]);
    }

    let fa = dir.join("asm.fa");
    fs::write(
        &fa,
        format!(">c1\n{}\n>c2\n{}\n>c3\n{}\n", contig, contig, contig),
    )?;

    let mut bed = String::new();
    for r in 0..10 {
        bed.push_str(&format!("c1\t{}\t{}\tr{}/1\n", 1800 + r, 1850 + r, r));
        bed.push_str(&format!("c2\t{}\t{}\tr{}/2\n", 100 + r, 150 + r, r));
    }
    bed.push_str("c3\t10\t60\tq1/1\nc3\t500\t550\tq1/2\n");
    let bed_file = dir.join("hic.bed");
    fs::write(&bed_file, bed)?;

    Ok((fa, bed_file))
}

fn fasta_records(path: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .split('>')
        .filter(|s| !s.is_empty())
        .map(|rec| {
            let mut lines = rec.lines();
            let name = lines.next().unwrap_or_default().to_string();
            (name, lines.collect())
        })
        .collect())
}

#[test]
fn command_run_joins_two_contigs() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let (fa, bed) = fixture(temp.path())?;
    let outdir = temp.path().join("out");

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("run")
        .arg("-a")
        .arg(&fa)
        .arg("-b")
        .arg(&bed)
        .arg("-e")
        .arg("MboI")
        .arg("-o")
        .arg(&outdir)
        .arg("-i")
        .arg("1")
        .assert()
        .success();

    let records = fasta_records(&outdir.join("scaffolds_FINAL.fa"))?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].0, "scaffold_1");
    assert_eq!(records[0].1.len(), 4500);
    assert!(records[0].1.contains(&"N".repeat(500)));
    assert_eq!(records[1].1.len(), 2000);

    let paths = fs::read_to_string(outdir.join("scaffolds_FINAL.paths"))?;
    assert!(paths.contains("scaffold_1\tc1:B c1:E c2:B c2:E\tc1+ c2+\n"));

    let agp = fs::read_to_string(outdir.join("scaffolds_FINAL.agp"))?;
    assert_eq!(agp.lines().count(), 4);

    let scaled = fs::read_to_string(outdir.join("contig_links_scaled_sorted_iteration_1"))?;
    assert!(scaled.starts_with("c1:E\tc2:B\t"));
    assert!(scaled.trim_end().ends_with("True"));

    let steps = fs::read_to_string(outdir.join("steps.log"))?;
    assert!(steps.contains("\tdigest\tdone\t"));
    assert!(steps.contains("\tfinal\tdone\t"));

    Ok(())
}

#[test]
fn command_run_stops_without_new_links() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let (fa, bed) = fixture(temp.path())?;
    let outdir = temp.path().join("out");

    // the only link is used up in the first iteration
    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("run")
        .arg("-a")
        .arg(&fa)
        .arg("-b")
        .arg(&bed)
        .arg("-e")
        .arg("GATC")
        .arg("-o")
        .arg(&outdir)
        .arg("-i")
        .arg("5")
        .arg("--each")
        .assert()
        .success();

    assert!(outdir.join("scaffolds_ITERATION_1.fa").exists());
    assert!(outdir.join("contig_links_iteration_2").exists());
    assert!(!outdir.join("contig_links_iteration_3").exists());
    assert_eq!(fs::read_to_string(outdir.join("contig_links_iteration_2"))?, "");

    let records = fasta_records(&outdir.join("scaffolds_FINAL.fa"))?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].1.len(), 4500);

    Ok(())
}

#[test]
fn command_run_resumes() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let (fa, bed) = fixture(temp.path())?;
    let outdir = temp.path().join("out");

    for _ in 0..2 {
        let mut cmd = Command::cargo_bin("hiscaf")?;
        cmd.arg("run")
            .arg("-a")
            .arg(&fa)
            .arg("-b")
            .arg(&bed)
            .arg("-e")
            .arg("GATC")
            .arg("-o")
            .arg(&outdir)
            .arg("-i")
            .arg("1")
            .assert()
            .success();
    }

    let steps = fs::read_to_string(outdir.join("steps.log"))?;
    assert!(steps.contains("1\tlayout\tdone\t"));
    assert!(steps.contains("1\tlayout\tskipped\t"));
    assert!(steps.contains("1\tfinal\tskipped\t"));

    Ok(())
}

#[test]
fn command_run_cleans_and_filters_input() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let (fa, bed) = fixture(temp.path())?;
    let outdir = temp.path().join("out");

    let breaks = temp.path().join("breaks");
    fs::write(&breaks, "c3\t1000\n")?;
    let mut text = fs::read_to_string(&bed)?;
    text.push_str("unknown\t0\t10\tz1/1\nc1\t0\t10\tz1/2\n");
    fs::write(&bed, text)?;

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("run")
        .arg("-a")
        .arg(&fa)
        .arg("-b")
        .arg(&bed)
        .arg("-e")
        .arg("GATC")
        .arg("-o")
        .arg(&outdir)
        .arg("-i")
        .arg("1")
        .arg("--breaks")
        .arg(&breaks)
        .arg("--filter")
        .assert()
        .success();

    let lengths = fs::read_to_string(outdir.join("scaffold_length_iteration_1"))?;
    assert_eq!(lengths, "c1\t2000\nc2\t2000\nc3_1\t1000\nc3_2\t1000\n");
    assert!(outdir.join("assembly.cleaned.fa").exists());

    let filtered = fs::read_to_string(outdir.join("alignment_iteration_1.bed"))?;
    assert!(!filtered.contains("unknown"));

    let records = fasta_records(&outdir.join("scaffolds_FINAL.fa"))?;
    assert_eq!(records.len(), 3);

    Ok(())
}

#[test]
fn command_run_external_breaks() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let (fa, bed) = fixture(temp.path())?;
    let outdir = temp.path().join("out");

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("run")
        .arg("-a")
        .arg(&fa)
        .arg("-b")
        .arg(&bed)
        .arg("-e")
        .arg("GATC")
        .arg("-o")
        .arg(&outdir)
        .arg("-i")
        .arg("1")
        .arg("--break-cmd")
        .arg("printf 'scaffold_1_1\\t1990\\n'")
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(outdir.join("breakpoints_iteration_1"))?,
        "scaffold_1_1\t1990\n"
    );
    assert_eq!(
        fs::read_to_string(outdir.join("avoid_links_iteration_2"))?,
        "scaffold_1_1_1\tscaffold_1_1_2\n"
    );
    assert!(outdir.join("misasm_iteration_2.done").exists());

    let records = fasta_records(&outdir.join("scaffolds_FINAL.fa"))?;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|(_, seq)| !seq.contains('N')));

    Ok(())
}

#[test]
fn command_run_failing_detector() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let (fa, bed) = fixture(temp.path())?;
    let outdir = temp.path().join("out");

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("run")
        .arg("-a")
        .arg(&fa)
        .arg("-b")
        .arg(&bed)
        .arg("-e")
        .arg("GATC")
        .arg("-o")
        .arg(&outdir)
        .arg("--break-cmd")
        .arg("exit 1")
        .assert()
        .failure();

    assert!(!outdir.join("misasm_iteration_2.done").exists());
    assert!(!outdir.join("scaffolds_FINAL.fa").exists());

    Ok(())
}

#[test]
fn command_run_rejects_zero_iterations() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let (fa, bed) = fixture(temp.path())?;
    let outdir = temp.path().join("out");

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("run")
        .arg("-a")
        .arg(&fa)
        .arg("-b")
        .arg(&bed)
        .arg("-e")
        .arg("GATC")
        .arg("-o")
        .arg(&outdir)
        .arg("--iter")
        .arg("0")
        .assert()
        .failure();

    assert!(!outdir.exists());

    Ok(())
}

#[test]
fn command_run_missing_dup_file() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let (fa, bed) = fixture(temp.path())?;
    let outdir = temp.path().join("out");

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("run")
        .arg("-a")
        .arg(&fa)
        .arg("-b")
        .arg(&bed)
        .arg("-e")
        .arg("GATC")
        .arg("-o")
        .arg(&outdir)
        .arg("--dup")
        .arg(temp.path().join("absent.dup"))
        .assert()
        .failure();

    assert!(!outdir.join("scaffolds_FINAL.fa").exists());

    Ok(())
}
