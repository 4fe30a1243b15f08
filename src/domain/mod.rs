// Domain layer: translators, records and ports. No I/O happens here.

pub mod columns;
pub mod dates;
pub mod labels;
pub mod model;
pub mod ports;
