use crate::rig::{BoneId, Rig};

/// `root` 以下を深さ優先（行きがけ順）でたどる
///
/// 親の `visit` が終わってから子を訪れるので、子は親のこのティックの姿勢を前提にできる。
/// 兄弟はリグに登録された順。
pub fn walk<F>(rig: &mut Rig, root: BoneId, visit: &mut F)
where
    F: FnMut(&mut Rig, BoneId),
{
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        visit(rig, id);
        stack.extend(rig.bone(id).children.iter().rev().copied());
    }
}

/// リグの全ルートを登録順にたどる
pub fn walk_rig<F>(rig: &mut Rig, mut visit: F)
where
    F: FnMut(&mut Rig, BoneId),
{
    let roots: Vec<BoneId> = rig.roots().collect();
    for root in roots {
        walk(rig, root, &mut visit);
    }
}
