use crate::remote::{TimesheetLine, User};

/// ユーザーごとのタイムシート集計。時間単位。
#[derive(Clone, Debug, PartialEq)]
pub struct UserTimesheetStat {
    pub user: User,
    pub total_hours: f64,
    pub total_billable: f64,
}

/// タイムシート行をユーザーごとに集計する。
///
/// Odooからはユーザー順に並んだ行が返るため、連続する同じユーザーの行をまとめる。
/// 自分の集計は最後に並べ、それ以外の順序は保つ。
///
/// # Arguments
///
/// * `lines` - タスクのタイムシート行
/// * `current_user_id` - ログインユーザーのID
pub fn aggregate_by_user(lines: &[TimesheetLine], current_user_id: i64) -> Vec<UserTimesheetStat> {
    let mut stats: Vec<UserTimesheetStat> = Vec::new();
    for line in lines {
        let billable = if line.billable { line.unit_amount } else { 0.0 };
        match stats.last_mut() {
            Some(stat) if stat.user.id == line.user.id => {
                stat.total_hours += line.unit_amount;
                stat.total_billable += billable;
            }
            _ => stats.push(UserTimesheetStat {
                user: line.user.clone(),
                total_hours: line.unit_amount,
                total_billable: billable,
            }),
        }
    }

    // 安定ソートなので自分以外の順序は変わらない
    stats.sort_by_key(|stat| stat.user.id == current_user_id);
    stats
}

#[cfg(test)]
mod tests {
    use super::aggregate_by_user;
    use crate::remote::{TimesheetLine, User};

    fn user(id: i64) -> User {
        User {
            id,
            name: format!("User {}", id),
            username: format!("user{}", id),
            avatar_url: String::new(),
        }
    }

    fn line(user_id: i64, hours: f64, billable: bool) -> TimesheetLine {
        TimesheetLine {
            id: 0,
            name: "work".to_string(),
            unit_amount: hours,
            user: user(user_id),
            billable,
        }
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_by_user(&[], 1).is_empty());
    }

    #[test]
    fn test_aggregate_sums_consecutive_lines() {
        let lines = vec![
            line(3, 1.0, true),
            line(3, 0.5, false),
            line(2, 2.0, true),
        ];

        let stats = aggregate_by_user(&lines, 99);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].user.id, 3);
        assert_eq!(stats[0].total_hours, 1.5);
        assert_eq!(stats[0].total_billable, 1.0);
        assert_eq!(stats[1].total_hours, 2.0);
    }

    /// 自分の集計は最後に移動し、他のユーザーの順序は変わらない。
    #[test]
    fn test_aggregate_current_user_last() {
        let lines = vec![
            line(5, 1.0, true),
            line(4, 1.0, true),
            line(3, 1.0, true),
        ];

        let stats = aggregate_by_user(&lines, 4);

        let order: Vec<i64> = stats.iter().map(|stat| stat.user.id).collect();
        assert_eq!(order, vec![5, 3, 4]);
    }
}
