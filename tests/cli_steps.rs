use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn command_size() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let input = temp.path().join("test.fa");
    fs::write(&input, ">seq1\nACGT\n>seq2\nACGTACGT\n")?;

    let mut cmd = Command::cargo_bin("hiscaf")?;
    let output = cmd.arg("size").arg(&input).output()?;

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "seq1\t4\nseq2\t8\n");

    Ok(())
}

#[test]
fn command_digest() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let input = temp.path().join("test.fa");
    let sites = temp.path().join("re_sites");
    // length 20, midpoint 10: sites at 0 and 10 (GATC), 14 (GAATC)
    fs::write(&input, ">c1\nGATCaaaaaaGATCGAATCa\n>c2\nTTTTTTTT\n")?;

    let mut cmd = Command::cargo_bin("hiscaf")?;
    let output = cmd
        .arg("digest")
        .arg(&input)
        .arg("-e")
        .arg("GATC,GANTC")
        .arg("--sites")
        .arg(&sites)
        .output()?;

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "c1\t1\t2\nc2\t0\t0\n");
    assert_eq!(fs::read_to_string(&sites)?, "c1\t0,10,14\nc2\t\n");

    Ok(())
}

#[test]
fn command_digest_unknown_enzyme() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let input = temp.path().join("test.fa");
    fs::write(&input, ">c1\nGATC\n")?;

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("digest")
        .arg(&input)
        .arg("-e")
        .arg("EcoXYZ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown enzyme"));

    Ok(())
}

#[test]
fn command_links() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let bed = temp.path().join("hic.bed");
    let counts = temp.path().join("re_counts");
    let lengths = temp.path().join("sizes");
    let dup = temp.path().join("dup");

    fs::write(&lengths, "c1\t100\nc2\t100\nc3\t100\n")?;
    fs::write(&counts, "c1\t2\t2\nc2\t2\t2\nc3\t1\t1\n")?;
    fs::write(
        &bed,
        "c1\t5\t15\tr1/1\nc2\t85\t95\tr1/2\nc1\t90\t100\tr2/1\nc3\t0\t10\tr2/2\n",
    )?;
    fs::write(&dup, "c3\tc1\n")?;

    // c1 at 10 (B), c2 at 90 (E): 2 * 0.005 + 2 * 0.005 = 0.02
    let mut cmd = Command::cargo_bin("hiscaf")?;
    let output = cmd
        .arg("links")
        .arg(&bed)
        .arg("--counts")
        .arg(&counts)
        .arg("--lengths")
        .arg(&lengths)
        .arg("--dup")
        .arg(&dup)
        .output()?;

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "c1:B\tc2:E\t50\t1\n");

    // --dup only counts on the first iteration
    let mut cmd = Command::cargo_bin("hiscaf")?;
    let output = cmd
        .arg("links")
        .arg(&bed)
        .arg("--counts")
        .arg(&counts)
        .arg("--lengths")
        .arg(&lengths)
        .arg("--dup")
        .arg(&dup)
        .arg("--iteration")
        .arg("2")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.contains("c1:E\tc3:B\t"));

    Ok(())
}

#[test]
fn command_links_position_outside_contig() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let bed = temp.path().join("hic.bed");
    let counts = temp.path().join("re_counts");
    let lengths = temp.path().join("sizes");

    fs::write(&lengths, "c1\t100\nc2\t100\n")?;
    fs::write(&counts, "c1\t1\t1\nc2\t1\t1\n")?;
    fs::write(&bed, "c1\t500\t600\tr1/1\nc2\t0\t10\tr1/2\n")?;

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("links")
        .arg(&bed)
        .arg("--counts")
        .arg(&counts)
        .arg("--lengths")
        .arg(&lengths)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unexpected length in contig links attribution"));

    Ok(())
}

#[test]
fn command_scaled() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let input = temp.path().join("links");
    fs::write(&input, "A:B\tC:E\t4\t2\nA:E\tB:B\t10\t5\n")?;

    let mut cmd = Command::cargo_bin("hiscaf")?;
    let output = cmd.arg("scaled").arg(&input).output()?;

    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "A:E\tB:B\t10\t4\t2.5\t5\tEB\tTrue");
    assert_eq!(lines[1], "A:B\tC:E\t4\t10\t0.4\t2\tBE\tFalse");

    Ok(())
}

#[test]
fn command_ng50() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let input = temp.path().join("sizes");
    fs::write(&input, "a\t100\nb\t90\nc\t80\nd\t70\ne\t60\n")?;

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("ng50")
        .arg(&input)
        .arg("-s")
        .arg("400")
        .assert()
        .success()
        .stdout("80\n");

    let mut cmd = Command::cargo_bin("hiscaf")?;
    cmd.arg("ng50")
        .arg(&input)
        .arg("--genome-size")
        .arg("100000")
        .assert()
        .success()
        .stdout("0\n");

    Ok(())
}
