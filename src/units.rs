// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use float_cmp::approx_eq;
use lazy_static::lazy_static;

use crate::common::{UnitError, UnitResult};
use crate::datamodel::UnitDef;

/// Named-unit definitions may reference other named units; past this many
/// levels of indirection we call the definition self-referential rather
/// than recursing unboundedly.
const MAX_RESOLUTION_DEPTH: u32 = 64;

const EXPONENT_EPSILON: f64 = 1e-9;

/// A product of powers of base dimensions.  BTreeMap so iteration (and the
/// pretty-printed form in diagnostics) is deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitMap {
    map: BTreeMap<String, f64>,
}

impl UnitMap {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn single(dim: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert(dim.to_owned(), 1.0);
        UnitMap { map }
    }

    pub fn is_dimensionless(&self) -> bool {
        self.map.is_empty()
    }

    /// Accumulates `other^exponent` into this map, dropping dimensions
    /// whose exponents cancel to zero.
    pub fn accumulate(&mut self, other: &UnitMap, exponent: f64) {
        for (dim, exp) in other.map.iter() {
            let entry = self.map.entry(dim.clone()).or_insert(0.0);
            *entry += exp * exponent;
            if entry.abs() < EXPONENT_EPSILON {
                self.map.remove(dim);
            }
        }
    }

    pub fn equals(&self, other: &UnitMap) -> bool {
        if self.map.len() != other.map.len() {
            return false;
        }
        self.map.iter().all(|(dim, exp)| {
            other
                .map
                .get(dim)
                .is_some_and(|other_exp| approx_eq!(f64, *exp, *other_exp, epsilon = EXPONENT_EPSILON))
        })
    }
}

impl fmt::Display for UnitMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.map.is_empty() {
            return write!(f, "dimensionless");
        }
        let parts: Vec<String> = self
            .map
            .iter()
            .map(|(dim, exp)| {
                if approx_eq!(f64, *exp, 1.0, epsilon = EXPONENT_EPSILON) {
                    dim.clone()
                } else {
                    format!("{dim}^{exp}")
                }
            })
            .collect();
        write!(f, "{}", parts.join("*"))
    }
}

/// A unit reduced to canonical form: base-dimension exponents plus the
/// scalar scale relating one of this unit to the product of base units.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalUnit {
    pub dims: UnitMap,
    pub scale: f64,
}

impl CanonicalUnit {
    fn base(dim: &str) -> Self {
        CanonicalUnit {
            dims: UnitMap::single(dim),
            scale: 1.0,
        }
    }

    fn dimensionless() -> Self {
        CanonicalUnit {
            dims: UnitMap::new(),
            scale: 1.0,
        }
    }

    fn derived(dims: &[(&str, f64)], scale: f64) -> Self {
        let mut map = BTreeMap::new();
        for (dim, exp) in dims {
            map.insert((*dim).to_owned(), *exp);
        }
        CanonicalUnit {
            dims: UnitMap { map },
            scale,
        }
    }
}

lazy_static! {
    /// The built-in standard units: the SI base dimensions plus the named
    /// derived units models commonly reference.
    static ref STANDARD_UNITS: HashMap<&'static str, CanonicalUnit> = {
        use CanonicalUnit as CU;
        let mut m = HashMap::new();
        // base dimensions
        for dim in [
            "second", "metre", "kilogram", "ampere", "kelvin", "mole", "candela",
        ] {
            m.insert(dim, CU::base(dim));
        }
        m.insert("meter", CU::base("metre"));
        m.insert("dimensionless", CU::dimensionless());
        m.insert("radian", CU::dimensionless());
        m.insert("steradian", CU::dimensionless());
        // derived units
        m.insert("gram", CU::derived(&[("kilogram", 1.0)], 1e-3));
        m.insert("litre", CU::derived(&[("metre", 3.0)], 1e-3));
        m.insert("liter", CU::derived(&[("metre", 3.0)], 1e-3));
        m.insert("hertz", CU::derived(&[("second", -1.0)], 1.0));
        m.insert("becquerel", CU::derived(&[("second", -1.0)], 1.0));
        m.insert(
            "newton",
            CU::derived(&[("kilogram", 1.0), ("metre", 1.0), ("second", -2.0)], 1.0),
        );
        m.insert(
            "pascal",
            CU::derived(&[("kilogram", 1.0), ("metre", -1.0), ("second", -2.0)], 1.0),
        );
        m.insert(
            "joule",
            CU::derived(&[("kilogram", 1.0), ("metre", 2.0), ("second", -2.0)], 1.0),
        );
        m.insert(
            "watt",
            CU::derived(&[("kilogram", 1.0), ("metre", 2.0), ("second", -3.0)], 1.0),
        );
        m.insert(
            "coulomb",
            CU::derived(&[("ampere", 1.0), ("second", 1.0)], 1.0),
        );
        m.insert(
            "volt",
            CU::derived(
                &[
                    ("kilogram", 1.0),
                    ("metre", 2.0),
                    ("second", -3.0),
                    ("ampere", -1.0),
                ],
                1.0,
            ),
        );
        m.insert(
            "farad",
            CU::derived(
                &[
                    ("kilogram", -1.0),
                    ("metre", -2.0),
                    ("second", 4.0),
                    ("ampere", 2.0),
                ],
                1.0,
            ),
        );
        m.insert(
            "ohm",
            CU::derived(
                &[
                    ("kilogram", 1.0),
                    ("metre", 2.0),
                    ("second", -3.0),
                    ("ampere", -2.0),
                ],
                1.0,
            ),
        );
        m.insert(
            "siemens",
            CU::derived(
                &[
                    ("kilogram", -1.0),
                    ("metre", -2.0),
                    ("second", 3.0),
                    ("ampere", 2.0),
                ],
                1.0,
            ),
        );
        m.insert(
            "weber",
            CU::derived(
                &[
                    ("kilogram", 1.0),
                    ("metre", 2.0),
                    ("second", -2.0),
                    ("ampere", -1.0),
                ],
                1.0,
            ),
        );
        m.insert(
            "tesla",
            CU::derived(
                &[("kilogram", 1.0), ("second", -2.0), ("ampere", -1.0)],
                1.0,
            ),
        );
        m.insert(
            "henry",
            CU::derived(
                &[
                    ("kilogram", 1.0),
                    ("metre", 2.0),
                    ("second", -2.0),
                    ("ampere", -2.0),
                ],
                1.0,
            ),
        );
        m.insert("lumen", CU::derived(&[("candela", 1.0)], 1.0));
        m.insert("lux", CU::derived(&[("candela", 1.0), ("metre", -2.0)], 1.0));
        m.insert("gray", CU::derived(&[("metre", 2.0), ("second", -2.0)], 1.0));
        m.insert(
            "sievert",
            CU::derived(&[("metre", 2.0), ("second", -2.0)], 1.0),
        );
        m.insert(
            "katal",
            CU::derived(&[("mole", 1.0), ("second", -1.0)], 1.0),
        );
        m
    };
}

/// The unit algebra over a model's unit declarations.  Pure: resolution
/// has no side effects and two calls with the same inputs always agree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitTable {
    defs: HashMap<String, UnitDef>,
}

impl UnitTable {
    pub fn new(defs: &[UnitDef]) -> Self {
        let defs = defs
            .iter()
            .map(|def| (def.name.clone(), def.clone()))
            .collect();
        UnitTable { defs }
    }

    /// Flattens `name` to base dimensions and a scalar scale, following
    /// named-unit references recursively up to the depth bound.
    pub fn resolve(&self, name: &str) -> UnitResult<CanonicalUnit> {
        self.resolve_bounded(name, 0)
    }

    fn resolve_bounded(&self, name: &str, depth: u32) -> UnitResult<CanonicalUnit> {
        if depth > MAX_RESOLUTION_DEPTH {
            return Err(UnitError::Cyclic(name.to_owned()));
        }

        if let Some(def) = self.defs.get(name) {
            if def.refs.is_empty() {
                // a user-declared base unit introduces its own dimension
                return Ok(CanonicalUnit::base(name));
            }

            let mut dims = UnitMap::new();
            let mut scale = 1.0_f64;
            for unit_ref in def.refs.iter() {
                let resolved = self.resolve_bounded(&unit_ref.units, depth + 1).map_err(
                    |err| match err {
                        // attribute the cycle to the unit whose definition
                        // we are expanding, not the deepest reference
                        UnitError::Cyclic(_) => UnitError::Cyclic(name.to_owned()),
                        other => other,
                    },
                )?;
                dims.accumulate(&resolved.dims, unit_ref.exponent);
                scale *= unit_ref.multiplier
                    * (10.0_f64.powi(unit_ref.prefix) * resolved.scale).powf(unit_ref.exponent);
            }
            return Ok(CanonicalUnit { dims, scale });
        }

        match STANDARD_UNITS.get(name) {
            Some(unit) => Ok(unit.clone()),
            None => Err(UnitError::Unknown(name.to_owned())),
        }
    }

    /// The multiplicative factor converting a numeric value expressed in
    /// `from` into the same physical quantity expressed in `to`.  Errors
    /// if the two units don't share base dimensions.
    pub fn scaling_factor(&self, from: &str, to: &str) -> UnitResult<f64> {
        let from_unit = self.resolve(from)?;
        let to_unit = self.resolve(to)?;

        if !from_unit.dims.equals(&to_unit.dims) {
            return Err(UnitError::Incompatible {
                from: from.to_owned(),
                to: to.to_owned(),
                details: format!("{} vs {}", from_unit.dims, to_unit.dims),
            });
        }

        Ok(from_unit.scale / to_unit.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::UnitRef;

    fn table(defs: &[UnitDef]) -> UnitTable {
        UnitTable::new(defs)
    }

    #[test]
    fn test_standard_units() {
        let table = table(&[]);

        let second = table.resolve("second").unwrap();
        assert_eq!(UnitMap::single("second"), second.dims);
        assert_eq!(1.0, second.scale);

        let volt = table.resolve("volt").unwrap();
        assert!(!volt.dims.is_dimensionless());

        assert_eq!(
            UnitError::Unknown("furlong".to_owned()),
            table.resolve("furlong").unwrap_err()
        );
    }

    #[test]
    fn test_prefixed_unit_scale() {
        let millisecond = UnitDef {
            name: "millisecond".to_owned(),
            refs: vec![UnitRef {
                units: "second".to_owned(),
                prefix: -3,
                exponent: 1.0,
                multiplier: 1.0,
            }],
        };
        let table = table(&[millisecond]);

        let ms = table.resolve("millisecond").unwrap();
        assert_eq!(UnitMap::single("second"), ms.dims);
        assert!(approx_eq!(f64, 1e-3, ms.scale, epsilon = 1e-12));

        // 1000 ms expressed in seconds is 1000 * 1e-3 = 1.0
        let factor = table.scaling_factor("millisecond", "second").unwrap();
        assert!(approx_eq!(f64, 1e-3, factor, epsilon = 1e-12));
        let back = table.scaling_factor("second", "millisecond").unwrap();
        assert!(approx_eq!(f64, 1e3, back, epsilon = 1e-9));
    }

    #[test]
    fn test_compound_unit() {
        // per_mv_ms = 1 / (millivolt * millisecond)
        let defs = vec![
            UnitDef {
                name: "millivolt".to_owned(),
                refs: vec![UnitRef {
                    units: "volt".to_owned(),
                    prefix: -3,
                    exponent: 1.0,
                    multiplier: 1.0,
                }],
            },
            UnitDef {
                name: "millisecond".to_owned(),
                refs: vec![UnitRef {
                    units: "second".to_owned(),
                    prefix: -3,
                    exponent: 1.0,
                    multiplier: 1.0,
                }],
            },
            UnitDef {
                name: "per_mv_ms".to_owned(),
                refs: vec![
                    UnitRef {
                        units: "millivolt".to_owned(),
                        prefix: 0,
                        exponent: -1.0,
                        multiplier: 1.0,
                    },
                    UnitRef {
                        units: "millisecond".to_owned(),
                        prefix: 0,
                        exponent: -1.0,
                        multiplier: 1.0,
                    },
                ],
            },
        ];
        let table = table(&defs);

        let unit = table.resolve("per_mv_ms").unwrap();
        assert!(approx_eq!(f64, 1e6, unit.scale, epsilon = 1e-3));
    }

    #[test]
    fn test_multiplier_applies_once_per_reference() {
        // foot = 0.3048 metre; square_foot = foot^2 with no extra multiplier
        let defs = vec![
            UnitDef {
                name: "foot".to_owned(),
                refs: vec![UnitRef {
                    units: "metre".to_owned(),
                    prefix: 0,
                    exponent: 1.0,
                    multiplier: 0.3048,
                }],
            },
            UnitDef {
                name: "square_foot".to_owned(),
                refs: vec![UnitRef {
                    units: "foot".to_owned(),
                    prefix: 0,
                    exponent: 2.0,
                    multiplier: 1.0,
                }],
            },
        ];
        let table = table(&defs);

        let sq_ft = table.resolve("square_foot").unwrap();
        assert!(approx_eq!(
            f64,
            0.3048 * 0.3048,
            sq_ft.scale,
            epsilon = 1e-12
        ));
    }

    #[test]
    fn test_incompatible_dimensions() {
        let table = table(&[]);
        let err = table.scaling_factor("second", "metre").unwrap_err();
        assert!(matches!(err, UnitError::Incompatible { .. }));
    }

    #[test]
    fn test_cyclic_definition() {
        let defs = vec![
            UnitDef {
                name: "a".to_owned(),
                refs: vec![UnitRef {
                    units: "b".to_owned(),
                    prefix: 0,
                    exponent: 1.0,
                    multiplier: 1.0,
                }],
            },
            UnitDef {
                name: "b".to_owned(),
                refs: vec![UnitRef {
                    units: "a".to_owned(),
                    prefix: 0,
                    exponent: 1.0,
                    multiplier: 1.0,
                }],
            },
        ];
        let table = table(&defs);

        assert_eq!(
            UnitError::Cyclic("a".to_owned()),
            table.resolve("a").unwrap_err()
        );
    }

    #[test]
    fn test_user_base_dimension() {
        let defs = vec![UnitDef {
            name: "widget".to_owned(),
            refs: vec![],
        }];
        let table = table(&defs);

        let widget = table.resolve("widget").unwrap();
        assert_eq!(UnitMap::single("widget"), widget.dims);

        // a user base dimension is incompatible with everything else
        assert!(table.scaling_factor("widget", "second").is_err());
    }

    #[test]
    fn test_dimensionless_cancellation() {
        let mut map = UnitMap::single("second");
        map.accumulate(&UnitMap::single("second"), -1.0);
        assert!(map.is_dimensionless());
    }
}
