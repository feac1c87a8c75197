use super::merge::merge_shifts;
use super::util::overlaps;
use crate::model::{Shift, UserId, UserOverride};

/// Applique les remplacements à un jeu de shifts.
///
/// Les retraits et remplacements s'appliquent dans l'ordre croissant de leur
/// début, chacun sur le résultat du précédent ; les ajouts purs viennent
/// ensuite, comme des shifts autonomes. Le résultat est fusionné.
pub fn apply_overrides(shifts: Vec<Shift>, overrides: &[UserOverride]) -> Vec<Shift> {
    let (mut removals, additions): (Vec<&UserOverride>, Vec<&UserOverride>) =
        overrides.iter().partition(|o| o.remove_user.is_some());
    removals.sort_by_key(|o| o.start);

    let mut working = shifts;
    for o in removals {
        let Some(remove) = &o.remove_user else {
            continue;
        };
        working = working
            .into_iter()
            .flat_map(|s| split_shift(s, o, remove))
            .collect();
    }

    working.extend(additions.into_iter().filter_map(|o| {
        o.add_user
            .as_ref()
            .map(|user| Shift::new(o.start, o.end, user.clone()))
    }));
    merge_shifts(working)
}

/// Découpe `shift` autour de la fenêtre du remplacement : avant et après
/// restent à l'utilisateur d'origine, le chevauchement passe à `add_user` (ou
/// disparaît). Les morceaux vides sont omis.
fn split_shift(shift: Shift, o: &UserOverride, remove: &UserId) -> Vec<Shift> {
    if &shift.user_id != remove || !overlaps(shift.start, shift.end, o.start, o.end) {
        return vec![shift];
    }

    let mut parts = Vec::with_capacity(3);
    if shift.start < o.start {
        parts.push(Shift::new(shift.start, o.start, shift.user_id.clone()));
    }
    if let Some(add) = &o.add_user {
        parts.push(Shift::new(
            shift.start.max(o.start),
            shift.end.min(o.end),
            add.clone(),
        ));
    }
    if o.end < shift.end {
        parts.push(Shift::new(o.end, shift.end, shift.user_id));
    }
    parts
}
