use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn pdb_line(serial: usize, res: &str, num: usize, x: f64) -> String {
    format!(
        "{:<6}{:>5} {:<4}{}{:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}  1.00  0.00\n",
        "ATOM", serial, "CA", ' ', res, 'A', num, ' ', x, 0.0, 0.0
    )
}

// MKVLAAGHEWRS numbered from 101, CA atoms 3.8 apart on a line
fn sample_pdb() -> String {
    let residues = [
        "MET", "LYS", "VAL", "LEU", "ALA", "ALA", "GLY", "HIS", "GLU", "TRP", "ARG", "SER",
    ];
    let mut pdb = String::from("HEADER    TEST STRUCTURE\n");
    for (i, res) in residues.iter().enumerate() {
        pdb += &pdb_line(i + 1, res, i + 101, i as f64 * 3.8);
    }
    pdb += "TER\nEND\n";
    pdb
}

const ALIGNMENT: &str = "\
>s0 Homo sapiens
MKVLAAGHEWRS
>s1 Mus musculus
MKVLTTGHDWKS
>s2 Danio rerio
MRVLSAGQEWRA
>s3 Gallus gallus
LKILAPGHEFRS
>s4 Pan troglodytes
MKVLAAGHEWRT
>s5 Xenopus laevis
MKVLAXGHEWRS
";

#[test]
fn command_process_pdb() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let infile = temp.path().join("PF00071.full.fasta");
    std::fs::write(&infile, ALIGNMENT)?;
    let pdb = temp.path().join("1abc.pdb");
    std::fs::write(&pdb, sample_pdb())?;
    let outdir = temp.path().join("out");

    let mut cmd = Command::cargo_bin("msaprep")?;
    cmd.arg("process")
        .arg(&infile)
        .arg("--pdb")
        .arg(&pdb)
        .arg("--chain")
        .arg("A")
        .arg("--phylip")
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .success();

    // s4 is too close to the reference, s5 has a non-standard residue
    let fasta = std::fs::read_to_string(outdir.join("PF00071_processed.fasta"))?;
    assert_eq!(fasta.lines().count(), 8);
    assert!(fasta.starts_with(">s0 Homo sapiens\nMKVLAAGHEWRS\n"));
    assert!(!fasta.contains(">s4"));
    assert!(!fasta.contains(">s5"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(outdir.join("PF00071.json"))?)?;
    assert_eq!(json["nseq"], 4);
    assert_eq!(json["npos"], 12);
    assert_eq!(json["ats"][0], "101");
    assert_eq!(json["ats"][11], "112");
    assert_eq!(json["i_ref"], 0);
    assert_eq!(json["i_ref_final"], 0);
    assert_eq!(json["pdb_chain"], "A");
    let distmat = json["distmat"].as_array().unwrap();
    assert_eq!(distmat.len(), 12);
    let d = distmat[0][2].as_f64().unwrap();
    assert!((d - 7.6).abs() < 1e-6);
    assert_eq!(distmat[3][3], 0.0);

    let phy = std::fs::read_to_string(outdir.join("PF00071.phy"))?;
    let lines: Vec<&str> = phy.lines().collect();
    assert_eq!(lines[0], "12");
    assert!(lines[1].starts_with("0_101\t0\t"));
    assert_eq!(lines.len(), 13);

    Ok(())
}

#[test]
fn command_process_index_truncate() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let infile = temp.path().join("fam.fasta");
    std::fs::write(
        &infile,
        ">s0\nMKV-LWHEAC\n>s1\nMKVCLWHEAC\n>s2\nMRVCLYHEAC\n>s3\nMKACLWHDAC\n",
    )?;
    let outdir = temp.path().join("out");

    let mut cmd = Command::cargo_bin("msaprep")?;
    cmd.arg("process")
        .arg(&infile)
        .arg("--refindex")
        .arg("0")
        .arg("--pdb")
        .arg("no_such.pdb")
        .arg("--truncate")
        .arg("-p")
        .args(["0.5", "0.5", "0.0", "1.0"])
        .arg("--output")
        .arg("run1")
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .success()
        .stderr(predicate::str::contains("ignoring the PDB file"));

    let fasta = std::fs::read_to_string(outdir.join("run1_processed.fasta"))?;
    assert!(fasta.starts_with(">s0\nMKVLWHEAC\n"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(outdir.join("run1.json"))?)?;
    assert_eq!(json["npos"], 9);
    assert_eq!(json["ats"].as_array().unwrap().len(), 9);
    assert_eq!(json["ats"][8], "9");
    assert_eq!(json["truncate_flag"], true);
    assert!(json.get("distmat").is_none());
    assert!(json["pdbid"].is_null());
    assert_eq!(json["trim_parameters"][1], 0.5);

    Ok(())
}

#[test]
fn command_process_failure_writes_nothing() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let infile = temp.path().join("fam.fasta");
    std::fs::write(&infile, ">s0\nMKVCLWHEAC\n>s1\nMRVCLYHEAC\n")?;
    let outdir = temp.path().join("out");

    let mut cmd = Command::cargo_bin("msaprep")?;
    cmd.arg("process")
        .arg(&infile)
        .arg("--refindex")
        .arg("10")
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("reference"));
    assert!(!outdir.exists());

    let mut cmd = Command::cargo_bin("msaprep")?;
    cmd.arg("process")
        .arg(&infile)
        .arg("-p")
        .args(["0.2", "0.2", "0.2", "1.5"])
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside [0, 1]"));
    assert!(!outdir.exists());

    Ok(())
}

#[test]
fn command_process_auto_select() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let infile = temp.path().join("PF00071.fasta");
    std::fs::write(&infile, ALIGNMENT)?;
    let outdir = temp.path().join("Outputs");

    let mut cmd = Command::cargo_bin("msaprep")?;
    cmd.arg("process")
        .arg(&infile)
        .arg("--select")
        .arg("-p")
        .args(["0.2", "0.2", "0.0", "1.0"])
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(outdir.join("PF00071.json"))?)?;
    assert_eq!(json["limitseqs"], true);
    assert_eq!(json["nseq_prelimit"], 5);
    let nseq = json["nseq"].as_u64().unwrap();
    let effseqs = json["effseqs_prelimit"].as_f64().unwrap();
    assert_eq!(nseq, 5.min((1.5 * effseqs).floor() as u64));
    assert_eq!(json["seqw"].as_array().unwrap().len() as u64, nseq);
    assert!(!json["i_ref_final"].is_null());

    Ok(())
}
