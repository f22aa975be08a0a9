//! Chain-length statistics for diagnosing hash quality.

use core::fmt;

use crate::dict::Dict;

/// Histogram width; the last slot counts chains of this length or longer.
pub const DICT_STATS_VECTLEN: usize = 50;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableStats {
    pub table: usize,
    pub size: usize,
    pub used: usize,
    pub non_empty_buckets: usize,
    pub max_chain_len: usize,
    /// `histogram[n]` = number of buckets whose chain has `n` entries.
    pub histogram: [usize; DICT_STATS_VECTLEN],
}

impl TableStats {
    /// Mean length over non-empty chains.
    pub fn avg_chain_len(&self) -> f64 {
        if self.non_empty_buckets == 0 {
            0.0
        } else {
            self.used as f64 / self.non_empty_buckets as f64
        }
    }
}

/// Stats for each allocated table (one while idle, two while rehashing).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DictStats {
    pub tables: Vec<TableStats>,
}

impl<K, V, P> Dict<K, V, P> {
    pub fn stats(&self) -> DictStats {
        let tables = (0..2)
            .filter(|&t| self.ht[t].is_allocated())
            .map(|table| {
                let ht = &self.ht[table];
                let mut stats = TableStats {
                    table,
                    size: ht.size(),
                    used: ht.used,
                    non_empty_buckets: 0,
                    max_chain_len: 0,
                    histogram: [0; DICT_STATS_VECTLEN],
                };
                for &head in &ht.buckets {
                    let len = self.chain(head).count();
                    if len > 0 {
                        stats.non_empty_buckets += 1;
                    }
                    stats.max_chain_len = stats.max_chain_len.max(len);
                    stats.histogram[len.min(DICT_STATS_VECTLEN - 1)] += 1;
                }
                stats
            })
            .collect();
        DictStats { tables }
    }
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = if self.table == 0 {
            "main hash table"
        } else {
            "rehashing target"
        };
        writeln!(f, "Hash table {} stats ({role}):", self.table)?;
        if self.used == 0 {
            return writeln!(f, " No stats available for empty dictionaries");
        }
        writeln!(f, " table size: {}", self.size)?;
        writeln!(f, " number of elements: {}", self.used)?;
        writeln!(f, " different slots: {}", self.non_empty_buckets)?;
        writeln!(f, " max chain length: {}", self.max_chain_len)?;
        writeln!(f, " avg chain length (counted): {:.2}", self.avg_chain_len())?;
        writeln!(
            f,
            " avg chain length (computed): {:.2}",
            self.used as f64 / self.size as f64
        )?;
        writeln!(f, " Chain length distribution:")?;
        for (len, &count) in self.histogram.iter().enumerate() {
            if count == 0 {
                continue;
            }
            writeln!(
                f,
                "   {len}: {count} ({:.2}%)",
                count as f64 * 100.0 / self.size as f64
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for DictStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tables.is_empty() {
            return writeln!(f, "No stats available for empty dictionaries");
        }
        for table in &self.tables {
            write!(f, "{table}")?;
        }
        Ok(())
    }
}
