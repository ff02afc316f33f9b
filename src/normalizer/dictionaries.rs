//! Curated alias dictionaries for Strategic Management Journal entities.
//!
//! `THEORY_DICTIONARY`, `METHOD_DICTIONARY`, and `SOFTWARE_DICTIONARY` are
//! ported verbatim from the original pipeline. `PHENOMENON_DICTIONARY` has
//! no original-pipeline counterpart (that pipeline normalized phenomena by
//! embedding alone) but is required by the surrounding spec, which scopes
//! the canonical dictionary "per entity class" including phenomena; it is
//! authored fresh from the recurring strategic-management phenomena named
//! across the other dictionaries' theory/method entries (internationalization,
//! diversification, innovation, M&A, entry/exit, governance, alliances).
//! Each entry is `(canonical, aliases)`; canonical keys and aliases are
//! matched case-insensitively by `normalizer::lookup_table`.

pub const THEORY_DICTIONARY: &[(&str, &[&str])] = &[
    (
        "resource-based view",
        &[
            "rbv",
            "resource based view",
            "resource-based theory",
            "rbt",
            "resource based theory",
            "resource-based view (rbv)",
            "the resource-based view",
            "barney's rbv",
        ],
    ),
    (
        "dynamic capabilities",
        &[
            "dynamic capabilities theory",
            "dc",
            "dynamic capability",
            "teece's dynamic capabilities",
            "dynamic capabilities framework",
        ],
    ),
    (
        "knowledge-based view",
        &["kbv", "knowledge based view", "knowledge-based theory"],
    ),
    (
        "institutional theory",
        &[
            "neo-institutional theory",
            "institutional perspective",
            "new institutionalism",
            "institutional isomorphism",
            "dimaggio and powell",
            "institutional logic",
        ],
    ),
    (
        "transaction cost economics",
        &[
            "tce",
            "transaction cost theory",
            "tct",
            "williamson's tce",
            "transaction costs",
        ],
    ),
    (
        "agency theory",
        &[
            "principal-agent theory",
            "principal agent theory",
            "agency perspective",
            "agency problem",
            "jensen and meckling",
        ],
    ),
    (
        "stakeholder theory",
        &[
            "stakeholder perspective",
            "freeman's stakeholder theory",
            "stakeholder management",
        ],
    ),
    (
        "upper echelons theory",
        &[
            "uet",
            "upper echelons",
            "hambrick and mason",
            "top management team theory",
            "tmt theory",
        ],
    ),
    (
        "behavioral theory of the firm",
        &["btf", "cyert and march", "behavioral theory"],
    ),
    (
        "organizational learning",
        &[
            "organizational learning theory",
            "ol",
            "learning organization",
            "march's learning",
        ],
    ),
    (
        "absorptive capacity",
        &["acap", "cohen and levinthal", "absorptive capacity theory"],
    ),
    (
        "competitive advantage",
        &[
            "porter's competitive advantage",
            "sustainable competitive advantage",
            "sca",
            "competitive positioning",
        ],
    ),
    (
        "five forces",
        &[
            "porter's five forces",
            "industry forces",
            "five forces model",
            "competitive forces",
        ],
    ),
    (
        "positioning theory",
        &["strategic positioning", "porter's positioning"],
    ),
    (
        "social network theory",
        &["network theory", "social networks", "network perspective"],
    ),
    (
        "social capital theory",
        &["social capital", "relational capital"],
    ),
    (
        "embeddedness",
        &[
            "structural embeddedness",
            "relational embeddedness",
            "granovetter",
        ],
    ),
    (
        "corporate governance",
        &["governance theory", "board governance"],
    ),
    ("stewardship theory", &["stewardship perspective"]),
    (
        "organizational ecology",
        &[
            "population ecology",
            "hannan and freeman",
            "ecological perspective",
        ],
    ),
    (
        "evolutionary theory",
        &["evolutionary economics", "nelson and winter"],
    ),
    (
        "attention-based view",
        &["abv", "attention based view", "ocasio's abv"],
    ),
    ("sensemaking", &["sensemaking theory", "weick's sensemaking"]),
    (
        "managerial cognition",
        &["cognitive perspective", "executive cognition"],
    ),
    ("real options theory", &["real options", "strategic options"]),
    ("game theory", &["strategic games", "game theoretic"]),
    (
        "information economics",
        &["information asymmetry", "signaling theory"],
    ),
    (
        "contingency theory",
        &["contingency perspective", "strategic contingency"],
    ),
    (
        "configurational theory",
        &["configuration theory", "strategic configurations"],
    ),
    ("imitation", &["mimetic isomorphism", "competitive imitation"]),
    (
        "legitimacy theory",
        &["organizational legitimacy", "legitimacy perspective"],
    ),
    (
        "identity theory",
        &["organizational identity", "identity perspective"],
    ),
];

pub const METHOD_DICTIONARY: &[(&str, &[&str])] = &[
    (
        "ordinary least squares",
        &["ols", "ols regression", "linear regression", "least squares"],
    ),
    ("multiple regression", &["multivariate regression", "mreg"]),
    ("logistic regression", &["logit", "logit regression", "binary logistic"]),
    ("probit regression", &["probit", "probit model"]),
    ("tobit regression", &["tobit", "censored regression"]),
    ("poisson regression", &["poisson", "count regression"]),
    ("negative binomial regression", &["negative binomial", "negbin"]),
    (
        "fixed effects",
        &[
            "fe",
            "fixed effects regression",
            "within estimator",
            "entity fixed effects",
            "firm fixed effects",
        ],
    ),
    ("random effects", &["re", "random effects model", "gls random effects"]),
    ("panel data analysis", &["panel regression", "longitudinal analysis"]),
    (
        "generalized method of moments",
        &["gmm", "dynamic gmm", "system gmm", "arellano-bond"],
    ),
    (
        "difference-in-differences",
        &[
            "did",
            "diff-in-diff",
            "difference in differences",
            "dd",
            "natural experiment",
        ],
    ),
    (
        "instrumental variables",
        &["iv", "2sls", "two-stage least squares", "iv regression"],
    ),
    (
        "regression discontinuity",
        &["rdd", "rd design", "regression discontinuity design"],
    ),
    ("propensity score matching", &["psm", "matching", "propensity matching"]),
    ("heckman selection", &["heckman", "selection model", "heckman correction"]),
    (
        "structural equation modeling",
        &["sem", "structural equations", "lisrel", "amos sem"],
    ),
    ("path analysis", &["path model", "path modeling"]),
    ("confirmatory factor analysis", &["cfa", "factor analysis"]),
    (
        "hierarchical linear modeling",
        &[
            "hlm",
            "multilevel modeling",
            "mixed effects",
            "random coefficient",
            "multilevel regression",
        ],
    ),
    ("survival analysis", &["hazard model", "duration analysis", "time-to-event"]),
    ("cox proportional hazards", &["cox model", "cox regression", "proportional hazards"]),
    ("event study", &["event study methodology", "abnormal returns"]),
    (
        "case study",
        &[
            "case study method",
            "single case",
            "multiple case study",
            "comparative case study",
            "case analysis",
        ],
    ),
    ("grounded theory", &["grounded theory method", "gtm", "glaserian", "straussian"]),
    ("content analysis", &["qualitative content analysis", "text analysis"]),
    ("thematic analysis", &["theme analysis", "thematic coding"]),
    (
        "interviews",
        &["semi-structured interviews", "in-depth interviews", "qualitative interviews"],
    ),
    ("ethnography", &["ethnographic study", "participant observation"]),
    ("meta-analysis", &["meta-analytic", "quantitative review", "hedges and olkin"]),
    ("machine learning", &["ml", "predictive modeling"]),
    ("random forest", &["rf", "ensemble trees"]),
    ("support vector machine", &["svm", "support vector"]),
    ("neural network", &["nn", "deep learning", "artificial neural network"]),
    (
        "natural language processing",
        &["nlp", "text mining", "computational linguistics"],
    ),
    ("topic modeling", &["lda", "latent dirichlet allocation"]),
];

pub const SOFTWARE_DICTIONARY: &[(&str, &[&str])] = &[
    ("stata", &["stata 14", "stata 15", "stata 16", "stata 17", "statacorp"]),
    ("r", &["r statistical", "r studio", "rstudio", "r programming", "cran"]),
    ("python", &["python 3", "python programming", "anaconda"]),
    ("spss", &["ibm spss", "spss statistics", "pasw"]),
    ("sas", &["sas institute", "sas enterprise"]),
    ("matlab", &["mathworks matlab"]),
    ("mplus", &["mplus software", "muthen"]),
    ("amos", &["ibm amos", "amos graphics"]),
    ("lisrel", &["lisrel software"]),
    ("eviews", &["eviews software"]),
    ("nvivo", &["qsr nvivo", "nvivo qualitative"]),
    ("atlas.ti", &["atlas ti", "atlasti"]),
    ("maxqda", &["maxqda software"]),
    ("heckman", &["heckman model"]),
];

pub const PHENOMENON_DICTIONARY: &[(&str, &[&str])] = &[
    (
        "firm performance",
        &[
            "organizational performance",
            "firm-level performance",
            "financial performance",
            "corporate performance",
        ],
    ),
    (
        "internationalization",
        &[
            "international expansion",
            "global expansion",
            "foreign market entry",
            "multinationalization",
        ],
    ),
    (
        "diversification",
        &[
            "corporate diversification",
            "product diversification",
            "related diversification",
            "unrelated diversification",
        ],
    ),
    (
        "mergers and acquisitions",
        &["m&a", "mergers & acquisitions", "acquisition activity", "merger activity"],
    ),
    (
        "strategic alliances",
        &[
            "alliance formation",
            "interfirm alliances",
            "joint ventures",
            "strategic partnerships",
        ],
    ),
    (
        "corporate governance",
        &[
            "board governance",
            "governance structure",
            "board composition",
        ],
    ),
    (
        "innovation",
        &[
            "technological innovation",
            "product innovation",
            "innovation activity",
            "innovation performance",
        ],
    ),
    (
        "entrepreneurship",
        &[
            "entrepreneurial activity",
            "new venture creation",
            "corporate entrepreneurship",
        ],
    ),
    (
        "competitive advantage",
        &["sustained competitive advantage", "competitive position"],
    ),
    (
        "organizational change",
        &["organizational transformation", "strategic change"],
    ),
    (
        "entry and exit",
        &["market entry", "market exit", "industry entry", "industry exit"],
    ),
    (
        "top management team dynamics",
        &["tmt dynamics", "executive turnover", "ceo succession"],
    ),
];
