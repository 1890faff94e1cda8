use namematch_model::Gender;

/// One corpus row: a name's popularity in a single year. Produced only by
/// parsing raw reader lines; anything malformed yields no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub name: String,
    pub gender: Gender,
    pub rank_in_year: i64,
    pub total_that_year: i64,
    pub year: i32,
}

impl NameRecord {
    /// Parse a raw `name,gender,rank,total,year` line. Returns `None` for
    /// field-count mismatches, unknown gender codes, and numeric fields that
    /// fail to parse — the whole line is dropped either way.
    pub fn parse(line: &str) -> Option<NameRecord> {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != 5 {
            return None;
        }

        let gender = match parts[1] {
            "M" => Gender::Male,
            "F" => Gender::Female,
            _ => return None,
        };

        Some(NameRecord {
            name: parts[0].to_string(),
            gender,
            rank_in_year: parts[2].parse().ok()?,
            total_that_year: parts[3].parse().ok()?,
            year: parts[4].trim().parse().ok()?,
        })
    }
}

/// A single year's appearance within a name's series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameYearEntry {
    pub year: i32,
    pub rank_in_year: i64,
    pub total_that_year: i64,
    pub gender: Gender,
}

/// A candidate name with its year entries, ordered by descending rank. The
/// first entry is the most popular recorded appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSeries {
    pub name: String,
    pub entries: Vec<NameYearEntry>,
}

#[cfg(test)]
mod tests {
    use super::NameRecord;
    use namematch_model::Gender;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_valid_line() {
        let record = NameRecord::parse("Ava,F,1331,17254,2020").unwrap();
        assert_eq!(
            record,
            NameRecord {
                name: "Ava".to_string(),
                gender: Gender::Female,
                rank_in_year: 1331,
                total_that_year: 17254,
                year: 2020,
            }
        );
    }

    #[test]
    fn rejects_malformed_permutations() {
        // field-count mismatches
        assert_eq!(NameRecord::parse(""), None);
        assert_eq!(NameRecord::parse("Ava,F,1331,17254"), None);
        assert_eq!(NameRecord::parse("Ava,F,1331,17254,2020,extra"), None);
        // non-numeric rank / total / year
        assert_eq!(NameRecord::parse("Ava,F,abc,17254,2020"), None);
        assert_eq!(NameRecord::parse("Ava,F,1331,xyz,2020"), None);
        assert_eq!(NameRecord::parse("Ava,F,1331,17254,year"), None);
        // unknown gender code
        assert_eq!(NameRecord::parse("Ava,X,1331,17254,2020"), None);
    }
}
