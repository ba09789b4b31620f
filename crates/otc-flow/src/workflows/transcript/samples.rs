/// A bundled transcript and the extraction it is expected to produce.
#[derive(Debug, Clone, Copy)]
pub struct SampleTranscript {
    pub id: &'static str,
    pub description: &'static str,
    pub text: &'static str,
    pub expected: SampleExpectation,
}

#[derive(Debug, Clone, Copy)]
pub struct SampleExpectation {
    pub complaint_id: &'static str,
    pub rule_pack_id: &'static str,
    pub age: u32,
    pub sex: &'static str,
    pub pregnant: &'static str,
    /// Boolean answers as `yes`/`no`.
    pub answers: &'static [(&'static str, &'static str)],
    pub duration_days: u32,
}

pub const SAMPLE_TRANSCRIPTS: &[SampleTranscript] = &[
    SampleTranscript {
        id: "uti_classic",
        description: "Typical uncomplicated UTI presentation in a non-pregnant adult.",
        text: "28 year old female reports burning when passing urine and needing to pee every hour for the last 2 days. Denies fever, loin pain, or vaginal discharge. Not pregnant.",
        expected: SampleExpectation {
            complaint_id: "urinary_symptoms",
            rule_pack_id: "uti_women_16_64",
            age: 28,
            sex: "female",
            pregnant: "no",
            answers: &[
                ("dysuria", "yes"),
                ("frequency", "yes"),
                ("fever", "no"),
                ("loinPain", "no"),
                ("vaginalDischarge", "no"),
            ],
            duration_days: 2,
        },
    },
    SampleTranscript {
        id: "feverpain_high",
        description: "High FeverPAIN score with absence of cough.",
        text: "22-year-old woman with sore throat starting 2 days ago. Reports fever yesterday, pus on her tonsils, very inflamed throat, and no cough. Denies breathing difficulty or immunocompromise.",
        expected: SampleExpectation {
            complaint_id: "sore_throat",
            rule_pack_id: "sore_throat_feverpain",
            age: 22,
            sex: "female",
            pregnant: "unknown",
            answers: &[
                ("fever", "yes"),
                ("purulence", "yes"),
                ("inflamedTonsils", "yes"),
                ("noCough", "yes"),
                ("airwayCompromise", "no"),
                ("immunocompromise", "no"),
            ],
            duration_days: 2,
        },
    },
    SampleTranscript {
        id: "ambiguous_dual",
        description: "Overlapping complaints trigger low-confidence suggestions and warnings.",
        text: "35 yo male complains of throat irritation but mostly burning urine for 3 days. Mentions urinary frequency and no visible blood in urine. Pregnancy test negative.",
        expected: SampleExpectation {
            complaint_id: "urinary_symptoms",
            rule_pack_id: "uti_women_16_64",
            age: 35,
            sex: "male",
            pregnant: "no",
            answers: &[
                ("dysuria", "yes"),
                ("frequency", "yes"),
                ("visibleHaematuria", "no"),
            ],
            duration_days: 3,
        },
    },
];

pub fn sample(id: &str) -> Option<&'static SampleTranscript> {
    SAMPLE_TRANSCRIPTS.iter().find(|sample| sample.id == id)
}
