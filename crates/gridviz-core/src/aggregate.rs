//! District-level totals over the joined generator and load tables.

use serde::Serialize;

use crate::record::{FieldValue, Record};
use crate::units::{Kilovolts, Kilowatts, Megawatts};

/// Voltage above which an entity counts as medium-voltage-and-above.
pub const MV_THRESHOLD: Kilovolts = Kilovolts(0.4);

pub const P_NOM_KEY: &str = "p_nom";
pub const V_NOM_KEY: &str = "v_nom";
pub const PEAK_LOAD_KEY: &str = "peak_load";
pub const ANNUAL_CONSUMPTION_KEY: &str = "annual_consumption";
pub const MV_CAPACITY_KEY: &str = "mv_dea_capacity";
pub const LV_CAPACITY_KEY: &str = "lv_dea_capacity";

/// Totals for one grid identifier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DistrictAggregate {
    /// Generation capacity with `v_nom` above the threshold.
    pub mv_generation: Kilowatts,
    /// Generation capacity with `v_nom` at or below the threshold.
    pub lv_generation: Kilowatts,
    pub peak_load: Kilowatts,
    /// Sum of the loads' `annual_consumption`, in the table's unit.
    pub annual_consumption: f64,
}

impl DistrictAggregate {
    pub fn total_generation(&self) -> Kilowatts {
        self.mv_generation + self.lv_generation
    }

    /// Raw-key record for the district enricher.
    pub fn to_record(&self) -> Record {
        Record::from_fields([
            (MV_CAPACITY_KEY, FieldValue::from(self.mv_generation.value())),
            (LV_CAPACITY_KEY, FieldValue::from(self.lv_generation.value())),
            (PEAK_LOAD_KEY, FieldValue::from(self.peak_load.value())),
            (ANNUAL_CONSUMPTION_KEY, FieldValue::from(self.annual_consumption)),
        ])
    }
}

/// Computes [`DistrictAggregate`]s.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    pub threshold: Kilovolts,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            threshold: MV_THRESHOLD,
        }
    }
}

impl Aggregator {
    pub fn new(threshold: Kilovolts) -> Self {
        Self { threshold }
    }

    /// Absent or non-numeric values count as zero; sums run in input order.
    pub fn aggregate(&self, generators: &[Record], loads: &[Record]) -> DistrictAggregate {
        let mut totals = DistrictAggregate::default();

        for generator in generators {
            let capacity = Megawatts(generator.number_or_zero(P_NOM_KEY)).to_kilowatts();
            if self.is_medium_voltage(generator) {
                totals.mv_generation = totals.mv_generation + capacity;
            } else {
                totals.lv_generation = totals.lv_generation + capacity;
            }
        }

        for load in loads {
            totals.peak_load = totals.peak_load + Kilowatts(load.number_or_zero(PEAK_LOAD_KEY));
            totals.annual_consumption += load.number_or_zero(ANNUAL_CONSUMPTION_KEY);
        }

        totals
    }

    pub fn is_medium_voltage(&self, record: &Record) -> bool {
        Kilovolts(record.number_or_zero(V_NOM_KEY)) > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(p_nom: f64, v_nom: Option<f64>) -> Record {
        Record::from_fields([
            (P_NOM_KEY, FieldValue::Float(p_nom)),
            (V_NOM_KEY, v_nom.map(FieldValue::Float).unwrap_or_default()),
        ])
    }

    fn load(peak: FieldValue, consumption: FieldValue) -> Record {
        Record::from_fields([(PEAK_LOAD_KEY, peak), (ANNUAL_CONSUMPTION_KEY, consumption)])
    }

    #[test]
    fn splits_generation_at_threshold_and_scales_to_kw() {
        let generators = vec![
            generator(0.5, Some(20.0)),
            generator(0.25, Some(0.4)),
            generator(0.125, Some(0.23)),
            generator(2.0, Some(110.0)),
        ];
        let totals = Aggregator::default().aggregate(&generators, &[]);
        assert_eq!(totals.mv_generation, Kilowatts(2500.0));
        assert_eq!(totals.lv_generation, Kilowatts(375.0));
    }

    #[test]
    fn missing_voltage_counts_as_low_voltage() {
        let totals = Aggregator::default().aggregate(&[generator(1.0, None)], &[]);
        assert_eq!(totals.lv_generation, Kilowatts(1000.0));
        assert_eq!(totals.mv_generation, Kilowatts(0.0));
    }

    #[test]
    fn load_totals_treat_missing_as_zero() {
        let loads = vec![
            load(FieldValue::Float(12.5), FieldValue::Integer(30000)),
            load(FieldValue::Missing, FieldValue::Float(500.0)),
            load(FieldValue::Float(7.5), FieldValue::Missing),
        ];
        let totals = Aggregator::default().aggregate(&[], &loads);
        assert_eq!(totals.peak_load, Kilowatts(20.0));
        assert_eq!(totals.annual_consumption, 30500.0);
    }

    #[test]
    fn any_threshold_partitions_the_total() {
        let generators: Vec<Record> = [0.1, 0.4, 0.69, 10.0, 20.0, 110.0]
            .iter()
            .enumerate()
            .map(|(i, v)| generator(0.25 * (i + 1) as f64, Some(*v)))
            .collect();
        let unfiltered: f64 = generators
            .iter()
            .map(|g| g.number_or_zero(P_NOM_KEY) * 1000.0)
            .sum();

        for threshold in [0.0, 0.4, 1.0, 20.0, 500.0] {
            let totals = Aggregator::new(Kilovolts(threshold)).aggregate(&generators, &[]);
            assert_eq!(totals.total_generation().value(), unfiltered, "threshold {threshold}");
        }
    }

    #[test]
    fn record_uses_raw_keys() {
        let totals = DistrictAggregate {
            mv_generation: Kilowatts(10.0),
            lv_generation: Kilowatts(5.0),
            peak_load: Kilowatts(3.0),
            annual_consumption: 100.0,
        };
        let record = totals.to_record();
        assert_eq!(record.get(MV_CAPACITY_KEY), Some(&FieldValue::Float(10.0)));
        assert_eq!(record.get(ANNUAL_CONSUMPTION_KEY), Some(&FieldValue::Float(100.0)));
    }
}
