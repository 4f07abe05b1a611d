//! The fixed analysis instruction and literature query.
//!
//! The "Research Context" section asks the model to use a search tool, but the
//! report agent is built without tools. Literature links come from a separate
//! search with [`LITERATURE_QUERY`], which does not depend on the findings.

use std::fmt;

/// Query used for the "Relevant Medical Literature" section.
pub const LITERATURE_QUERY: &str = "Medical imaging abnormalities similar cases";

/// Number of literature results requested per analysis.
pub const LITERATURE_RESULTS: u32 = 3;

/// Ordinal severity scale the model is asked to rate findings on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Normal,
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub const ALL: [Self; 4] = [Self::Normal, Self::Mild, Self::Moderate, Self::Severe];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        }
    }

    /// The scale as written in the prompt, e.g. `Normal/Mild/Moderate/Severe`.
    #[must_use]
    pub fn scale() -> String {
        Self::ALL
            .iter()
            .map(|severity| severity.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the five-section instruction sent with every image.
#[must_use]
pub fn analysis_prompt() -> String {
    format!(
        r#"
You are a highly skilled medical imaging expert with extensive knowledge in radiology and diagnostic imaging. Analyze the patient's medical image and structure your response as follows:

### 1. Image Type & Region
- Specify imaging modality (X-ray/MRI/CT/Ultrasound/etc.)
- Identify the patient's anatomical region and positioning
- Comment on image quality and technical adequacy

### 2. Key Findings
- List primary observations systematically
- Note any abnormalities in the patient's imaging with precise descriptions
- Include measurements and densities where relevant
- Describe location, size, shape, and characteristics
- Rate severity: {scale}

### 3. Diagnostic Assessment
- Provide primary diagnosis with confidence level
- List differential diagnoses in order of likelihood
- Support each diagnosis with observed evidence from the patient's imaging
- Note any critical or urgent findings

### 4. Patient-Friendly Explanation
- Explain the findings in simple, clear language that the patient can understand
- Avoid medical jargon or provide clear definitions
- Include visual analogies if helpful
- Address common patient concerns related to these findings

### 5. Research Context
IMPORTANT: Use the GoogleSearch tool to:
- Find recent medical literature about similar cases
- Search for standard treatment protocols
- Provide a list of relevant medical links
- Research any relevant technological advances
- Include 2-3 key references to support your analysis

Format your response using clear markdown headers and bullet points. Be concise yet thorough.
"#,
        scale = Severity::scale()
    )
}
