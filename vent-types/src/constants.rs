pub const SPBV01: &str = "spBv1.0";

pub const NODE_CONTROL_REBIRTH: &str = "Node Control/Rebirth";
pub const BDSEQ: &str = "bdSeq";

pub const NBIRTH: &str = "NBIRTH";
pub const NDEATH: &str = "NDEATH";
pub const NCMD: &str = "NCMD";

pub const DBIRTH: &str = "DBIRTH";
pub const DDATA: &str = "DDATA";
pub const DCMD: &str = "DCMD";

/// Property key carrying the engineering unit of a metric
pub const ENG_UNIT: &str = "engUnit";
