use std::path::{Path, PathBuf};

pub const SAMPLE_REPORT: &str = "\
Category      Parameter            Value        Reference Range    Remarks
Blood Test    Hemoglobin           14.2 g/dl    13.8-17.2 g/dL     Normal
Blood Test    WBC                  11.8         4.5 to 11          High
Liver Panel   ALT                  32 U/L       10:40 U/L          Normal
Lipid Panel   LDL Cholesterol      see note     < 100 mg/dL        Borderline
Lipid Panel   HDL Cholesterol      52           40-60 mg/dL        Within Normal limits
Recommended Action                 [ ] Lifestyle Changes Advised
";

pub fn write_fixture(
    dir: &Path,
    name: &str,
    contents: &[u8],
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}
