use super::metrics::{percentage, round2, MunicipalityStat, COMPLIANCE_THRESHOLD};
use serde::Serialize;

/// Size of the top/lowest performer lists.
pub const PERFORMER_LIST_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceRanking {
    pub rank: usize,
    pub municipality: String,
    pub compliance_rate: f64,
    pub total_owners: usize,
    pub owners_with_license: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeedArea {
    pub municipality: String,
    pub need_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceSummary {
    pub overall_compliance_rate: f64,
    pub top_compliance_municipality: Option<ComplianceRanking>,
    pub highest_need_area: Option<NeedArea>,
    pub municipalities_needing_attention: usize,
    pub rankings: Vec<ComplianceRanking>,
    pub top_performers: Vec<ComplianceRanking>,
    pub lowest_performers: Vec<ComplianceRanking>,
}

impl ComplianceSummary {
    pub fn needs_attention(&self) -> impl Iterator<Item = &ComplianceRanking> {
        self.rankings
            .iter()
            .filter(|ranking| ranking.compliance_rate < COMPLIANCE_THRESHOLD)
    }
}

/// Overall and per-municipality license compliance. Empty input yields zeros.
pub fn analyze(stats: &[MunicipalityStat]) -> ComplianceSummary {
    let with_license: usize = stats.iter().map(|stat| stat.owners_with_license).sum();
    let total_owners: usize = stats.iter().map(|stat| stat.total_owners).sum();

    let mut top: Option<&MunicipalityStat> = None;
    let mut need: Option<(&MunicipalityStat, f64)> = None;
    for stat in stats {
        if top.map_or(true, |best| stat.compliance_rate > best.compliance_rate) {
            top = Some(stat);
        }
        let score = round2(100.0 - stat.compliance_rate);
        if need.map_or(true, |(_, best)| score > best) {
            need = Some((stat, score));
        }
    }

    let mut ordered: Vec<&MunicipalityStat> = stats.iter().collect();
    ordered.sort_by(|a, b| b.compliance_rate.total_cmp(&a.compliance_rate));
    let rankings: Vec<ComplianceRanking> = ordered
        .into_iter()
        .enumerate()
        .map(|(index, stat)| ranking(index + 1, stat))
        .collect();

    let top_performers = rankings.iter().take(PERFORMER_LIST_LEN).cloned().collect();
    let lowest_performers = rankings
        .iter()
        .rev()
        .take(PERFORMER_LIST_LEN)
        .cloned()
        .collect();

    ComplianceSummary {
        overall_compliance_rate: percentage(with_license, total_owners),
        top_compliance_municipality: top.map(|stat| {
            rankings
                .iter()
                .find(|ranking| ranking.municipality == stat.name)
                .cloned()
                .unwrap_or_else(|| ranking(1, stat))
        }),
        highest_need_area: need.map(|(stat, need_score)| NeedArea {
            municipality: stat.name.clone(),
            need_score,
        }),
        municipalities_needing_attention: stats
            .iter()
            .filter(|stat| stat.compliance_rate < COMPLIANCE_THRESHOLD)
            .count(),
        rankings,
        top_performers,
        lowest_performers,
    }
}

fn ranking(rank: usize, stat: &MunicipalityStat) -> ComplianceRanking {
    ComplianceRanking {
        rank,
        municipality: stat.name.clone(),
        compliance_rate: stat.compliance_rate,
        total_owners: stat.total_owners,
        owners_with_license: stat.owners_with_license,
    }
}
